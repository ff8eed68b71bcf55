//! Seed watchlist and the static company-name lookup table.

use crate::types::TrackedSymbol;

/// (ticker, name, price, change, change_percent, market_cap)
const SEEDS: &[(&str, &str, f64, f64, f64, &str)] = &[
    ("AAPL", "Apple Inc.", 172.45, 2.15, 1.26, "2.81T"),
    ("GOOGL", "Alphabet Inc.", 135.89, -1.02, -0.75, "1.72T"),
    ("MSFT", "Microsoft Corp.", 370.95, 1.55, 0.42, "2.75T"),
    ("AMZN", "Amazon.com, Inc.", 145.18, -2.82, -1.91, "1.51T"),
    ("TSLA", "Tesla, Inc.", 245.01, 5.62, 2.35, "780.44B"),
    ("NVDA", "NVIDIA Corp.", 489.99, -8.11, -1.63, "1.21T"),
];

pub fn seed_symbols() -> Vec<TrackedSymbol> {
    SEEDS
        .iter()
        .map(|&(ticker, name, price, change, change_percent, market_cap)| TrackedSymbol {
            ticker: ticker.to_string(),
            name: name.to_string(),
            price,
            previous_price: None,
            change,
            change_percent,
            market_cap: market_cap.to_string(),
        })
        .collect()
}

/// Resolve a display name for a ticker. Falls back to the ticker itself for
/// anything not in the table.
pub fn company_name(ticker: &str) -> String {
    let upper = ticker.to_ascii_uppercase();
    if let Some(&(_, name, ..)) = SEEDS.iter().find(|&&(t, ..)| t == upper) {
        return name.to_string();
    }
    let known = match upper.as_str() {
        "NFLX" => "Netflix, Inc.",
        "META" => "Meta Platforms, Inc.",
        "BABA" => "Alibaba Group Holding Limited",
        "JPM" => "JPMorgan Chase & Co.",
        "V" => "Visa Inc.",
        "WMT" => "Walmart Inc.",
        "PG" => "Procter & Gamble Company",
        "JNJ" => "Johnson & Johnson",
        "DIS" => "The Walt Disney Company",
        "PYPL" => "PayPal Holdings, Inc.",
        "ADBE" => "Adobe Inc.",
        "CRM" => "Salesforce, Inc.",
        "ORCL" => "Oracle Corporation",
        "INTC" => "Intel Corporation",
        "CSCO" => "Cisco Systems, Inc.",
        "PFE" => "Pfizer Inc.",
        "KO" => "The Coca-Cola Company",
        "PEP" => "PepsiCo, Inc.",
        "MCD" => "McDonald's Corporation",
        "NKE" => "NIKE, Inc.",
        _ => return upper,
    };
    known.to_string()
}
