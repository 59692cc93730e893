use serde::{Deserialize, Serialize};

/// Bus configuration.
///
/// Every option defaults to the plain dispatch behaviour: no receipts and no
/// limit on recursive posting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Post a `ReturnReceipt` after each post that reached at least one
    /// mailbox without a fault.
    pub return_receipts: bool,
    /// Maximum nesting of `post` calls on one thread. `None` leaves recursion
    /// unbounded, so a mailbox that reposts its own input exhausts the stack.
    pub max_post_depth: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = BusConfig::default();
        assert!(!cfg.return_receipts);
        assert_eq!(cfg.max_post_depth, None);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: BusConfig = serde_json::from_str(r#"{"max_post_depth": 64}"#).unwrap();
        assert_eq!(cfg.max_post_depth, Some(64));
        assert!(!cfg.return_receipts);

        let cfg: BusConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, BusConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let cfg = BusConfig {
            return_receipts: true,
            max_post_depth: Some(8),
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: BusConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
