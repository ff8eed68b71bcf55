//! Quest/XP progression layer. Quests are seeded at startup and live in
//! memory for the session, like everything else.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};

/// XP required per level.
pub const XP_PER_LEVEL: u32 = 100;
/// Fresh players start with a little XP from the tutorial.
const STARTING_XP: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    Available,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quest {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub xp: u32,
    pub status: QuestStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerProgress {
    pub xp: u32,
    pub level: u32,
    pub xp_into_level: u32,
    pub xp_per_level: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestReward {
    pub quest: Quest,
    pub progress: PlayerProgress,
}

pub fn level_for_xp(xp: u32) -> u32 {
    1 + xp / XP_PER_LEVEL
}

pub struct QuestLog {
    quests: RwLock<Vec<Quest>>,
    xp: AtomicU32,
}

impl QuestLog {
    pub fn new() -> Self {
        let seed = [
            (1, "First Steps", "Add a stock to your watchlist.", 50),
            (2, "Chart Reader", "Overlay a moving average on the price chart.", 75),
            (3, "News Hound", "Read an AI news summary for a stock you track.", 100),
            (4, "Screener Rookie", "Apply a price filter to the watchlist.", 75),
        ];
        let quests = seed
            .into_iter()
            .map(|(id, title, description, xp)| Quest {
                id,
                title: title.to_string(),
                description: description.to_string(),
                xp,
                status: QuestStatus::Available,
            })
            .collect();
        Self { quests: RwLock::new(quests), xp: AtomicU32::new(STARTING_XP) }
    }

    pub async fn quests(&self) -> Vec<Quest> {
        self.quests.read().await.clone()
    }

    pub fn progress(&self) -> PlayerProgress {
        let xp = self.xp.load(Ordering::Relaxed);
        PlayerProgress {
            xp,
            level: level_for_xp(xp),
            xp_into_level: xp % XP_PER_LEVEL,
            xp_per_level: XP_PER_LEVEL,
        }
    }

    /// Mark a quest completed and grant its XP. Completing twice is rejected.
    pub async fn complete(&self, id: u32) -> Result<QuestReward> {
        let mut quests = self.quests.write().await;
        let quest = quests
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(AppError::UnknownQuest(id))?;
        if quest.status == QuestStatus::Completed {
            return Err(AppError::QuestCompleted(id));
        }
        quest.status = QuestStatus::Completed;
        self.xp.fetch_add(quest.xp, Ordering::Relaxed);
        Ok(QuestReward { quest: quest.clone(), progress: self.progress() })
    }
}

impl Default for QuestLog {
    fn default() -> Self {
        Self::new()
    }
}
