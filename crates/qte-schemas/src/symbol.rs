//! Symbol identity helpers.
//!
//! A `Symbol` is an opaque string identifier. The only structural knowledge
//! the control plane needs is whether a symbol names an NFO option contract
//! or an NSE equity, because several components (risk caps, partial
//! booking, lot-size rules) branch on that distinction.

/// Returns true if `symbol` matches `<UNDERLYING><YY><MON><STRIKE>{CE|PE}`.
///
/// The digits between the underlying and the `CE`/`PE` suffix are mandatory:
/// a pure-alphabetic suffix (e.g. a ticker that happens to end in `"CE"`)
/// is equity, not an option.
pub fn is_option(symbol: &str) -> bool {
    let Some(rest) = strip_option_suffix(symbol) else {
        return false;
    };
    // `rest` is everything before CE/PE. Walk back from the end collecting
    // trailing ASCII digits (the strike); there must be at least one.
    let digit_count = rest.chars().rev().take_while(|c| c.is_ascii_digit()).count();
    digit_count > 0
}

fn strip_option_suffix(symbol: &str) -> Option<&str> {
    symbol
        .strip_suffix("CE")
        .or_else(|| symbol.strip_suffix("PE"))
}

#[cfg(test)]
mod tests {
    use super::is_option;

    #[test]
    fn option_with_digits_is_option() {
        assert!(is_option("NIFTY24DEC26000CE"));
        assert!(is_option("BANKNIFTY24JAN45000PE"));
    }

    #[test]
    fn equity_ending_in_ce_is_not_option() {
        assert!(!is_option("FORCE")); // ends in "CE" but no digits before it
        assert!(!is_option("RELIANCE"));
    }

    #[test]
    fn bare_ce_suffix_no_digits_is_not_option() {
        assert!(!is_option("ABCCE"));
    }
}
