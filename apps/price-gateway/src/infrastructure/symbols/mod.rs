//! Symbol Mapping Tables
//!
//! Static mappings between caller-facing tickers and the identifiers the
//! market data providers understand. All lookups are pure and total: an
//! unmapped input falls back to a deterministic default format.

// =============================================================================
// Kraken pairs
// =============================================================================

/// Map a ticker to the Kraken WebSocket v2 pair (`BTC` -> `BTC/USD`).
///
/// Kraken v2 uses `BTC/USD`, not the legacy `XBT` notation. Unmapped
/// tickers fall back to `{TICKER}/USD`.
#[must_use]
pub fn kraken_ws_pair(ticker: &str) -> String {
    let upper = ticker.to_uppercase();
    match upper.as_str() {
        "BTC" => "BTC/USD".to_string(),
        "ETH" => "ETH/USD".to_string(),
        "SOL" => "SOL/USD".to_string(),
        "XRP" => "XRP/USD".to_string(),
        "ADA" => "ADA/USD".to_string(),
        "DOGE" => "DOGE/USD".to_string(),
        "DOT" => "DOT/USD".to_string(),
        "MATIC" => "MATIC/USD".to_string(),
        "LTC" => "LTC/USD".to_string(),
        "LINK" => "LINK/USD".to_string(),
        "UNI" => "UNI/USD".to_string(),
        "XLM" => "XLM/USD".to_string(),
        "ATOM" => "ATOM/USD".to_string(),
        "XMR" => "XMR/USD".to_string(),
        "ETC" => "ETC/USD".to_string(),
        "FIL" => "FIL/USD".to_string(),
        "NEAR" => "NEAR/USD".to_string(),
        "ALGO" => "ALGO/USD".to_string(),
        _ => format!("{upper}/USD"),
    }
}

/// Map a ticker to the Kraken OHLC REST pair (`BTC` -> `XXBTZUSD`).
///
/// The REST API still uses Kraken's legacy asset codes for the majors.
/// Unmapped tickers fall back to `{TICKER}USD`.
#[must_use]
pub fn kraken_ohlc_pair(ticker: &str) -> String {
    let upper = ticker.to_uppercase();
    match upper.as_str() {
        "BTC" => "XXBTZUSD".to_string(),
        "ETH" => "XETHZUSD".to_string(),
        "SOL" => "SOLUSD".to_string(),
        "XRP" => "XXRPZUSD".to_string(),
        "ADA" => "ADAUSD".to_string(),
        "DOGE" => "XDGUSD".to_string(),
        "DOT" => "DOTUSD".to_string(),
        "MATIC" => "MATICUSD".to_string(),
        "LTC" => "XLTCZUSD".to_string(),
        "LINK" => "LINKUSD".to_string(),
        "UNI" => "UNIUSD".to_string(),
        "XLM" => "XXLMZUSD".to_string(),
        "ATOM" => "ATOMUSD".to_string(),
        "XMR" => "XXMRZUSD".to_string(),
        "ETC" => "XETCZUSD".to_string(),
        "FIL" => "FILUSD".to_string(),
        "NEAR" => "NEARUSD".to_string(),
        "ALGO" => "ALGOUSD".to_string(),
        _ => format!("{upper}USD"),
    }
}

// =============================================================================
// CoinGecko ids
// =============================================================================

/// Name/symbol to CoinGecko id entries, lowercased keys.
const COINGECKO_IDS: &[(&str, &str)] = &[
    ("bitcoin", "bitcoin"),
    ("btc", "bitcoin"),
    ("ethereum", "ethereum"),
    ("eth", "ethereum"),
    ("tether", "tether"),
    ("usdt", "tether"),
    ("binance coin", "binancecoin"),
    ("bnb", "binancecoin"),
    ("solana", "solana"),
    ("sol", "solana"),
    ("xrp", "ripple"),
    ("ripple", "ripple"),
    ("usd coin", "usd-coin"),
    ("usdc", "usd-coin"),
    ("cardano", "cardano"),
    ("ada", "cardano"),
    ("avalanche", "avalanche-2"),
    ("avax", "avalanche-2"),
    ("dogecoin", "dogecoin"),
    ("doge", "dogecoin"),
    ("polkadot", "polkadot"),
    ("dot", "polkadot"),
    ("polygon", "matic-network"),
    ("matic", "matic-network"),
    ("shiba inu", "shiba-inu"),
    ("shib", "shiba-inu"),
    ("litecoin", "litecoin"),
    ("ltc", "litecoin"),
    ("chainlink", "chainlink"),
    ("link", "chainlink"),
    ("tron", "tron"),
    ("trx", "tron"),
    ("bitcoin cash", "bitcoin-cash"),
    ("bch", "bitcoin-cash"),
    ("uniswap", "uniswap"),
    ("uni", "uniswap"),
    ("stellar", "stellar"),
    ("xlm", "stellar"),
    ("cosmos", "cosmos"),
    ("atom", "cosmos"),
    ("monero", "monero"),
    ("xmr", "monero"),
    ("ethereum classic", "ethereum-classic"),
    ("etc", "ethereum-classic"),
    ("hedera", "hedera-hashgraph"),
    ("hbar", "hedera-hashgraph"),
    ("filecoin", "filecoin"),
    ("fil", "filecoin"),
    ("aptos", "aptos"),
    ("apt", "aptos"),
    ("the open network", "the-open-network"),
    ("ton", "the-open-network"),
    ("internet computer", "internet-computer"),
    ("icp", "internet-computer"),
    ("near protocol", "near"),
    ("near", "near"),
    ("vechain", "vechain"),
    ("vet", "vechain"),
    ("algorand", "algorand"),
    ("algo", "algorand"),
];

/// Map a currency's name and ticker to a CoinGecko id.
///
/// Tries the ticker first (more specific), then the full name, then
/// falls back to the kebab-cased name, which matches CoinGecko's id
/// convention for most coins.
#[must_use]
pub fn coingecko_id(name: &str, ticker: &str) -> String {
    let lookup = |key: &str| {
        COINGECKO_IDS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, id)| (*id).to_string())
    };

    let ticker_lower = ticker.to_lowercase();
    if let Some(id) = lookup(&ticker_lower) {
        return id;
    }

    let name_lower = name.to_lowercase();
    lookup(&name_lower).unwrap_or_else(|| name_lower.replace(' ', "-"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("BTC", "BTC/USD"; "bitcoin")]
    #[test_case("btc", "BTC/USD"; "lowercase input")]
    #[test_case("DOGE", "DOGE/USD"; "doge")]
    #[test_case("PEPE", "PEPE/USD"; "unmapped falls back")]
    fn ws_pair(ticker: &str, expected: &str) {
        assert_eq!(kraken_ws_pair(ticker), expected);
    }

    #[test_case("BTC", "XXBTZUSD"; "bitcoin legacy code")]
    #[test_case("ETH", "XETHZUSD"; "ethereum legacy code")]
    #[test_case("SOL", "SOLUSD"; "modern code")]
    #[test_case("DOGE", "XDGUSD"; "doge legacy code")]
    #[test_case("PEPE", "PEPEUSD"; "unmapped falls back")]
    fn ohlc_pair(ticker: &str, expected: &str) {
        assert_eq!(kraken_ohlc_pair(ticker), expected);
    }

    #[test_case("Bitcoin", "BTC", "bitcoin"; "by ticker")]
    #[test_case("Avalanche", "AVAX", "avalanche-2"; "nontrivial id")]
    #[test_case("The Open Network", "ZZZ", "the-open-network"; "by name when ticker unknown")]
    #[test_case("Some New Coin", "SNC", "some-new-coin"; "kebab case fallback")]
    fn gecko_id(name: &str, ticker: &str, expected: &str) {
        assert_eq!(coingecko_id(name, ticker), expected);
    }

    #[test]
    fn ticker_beats_name() {
        // XRP's name maps elsewhere; ticker wins.
        assert_eq!(coingecko_id("Ripple Labs Token", "XRP"), "ripple");
    }
}
