/// Identity source for ledger transactions. Mirrors a wallet-connect flow:
/// either one connected address or nothing.
pub trait WalletProvider: Send + Sync {
    fn connected_address(&self) -> Option<String>;

    fn is_connected(&self) -> bool {
        self.connected_address().is_some()
    }
}

/// Fixed identity, or none while disconnected. Useful for tests and for
/// dashboards that resolve the address once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticWallet {
    address: Option<String>,
}

impl StaticWallet {
    pub fn connected(address: impl Into<String>) -> Self {
        let address = address.into();
        let address = address.trim().to_string();
        Self {
            address: (!address.is_empty()).then_some(address),
        }
    }

    pub fn disconnected() -> Self {
        Self { address: None }
    }
}

impl WalletProvider for StaticWallet {
    fn connected_address(&self) -> Option<String> {
        self.address.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_wallet_exposes_address() {
        let wallet = StaticWallet::connected("0xabc123");
        assert_eq!(wallet.connected_address().as_deref(), Some("0xabc123"));
        assert!(wallet.is_connected());
    }

    #[test]
    fn blank_address_counts_as_disconnected() {
        assert!(!StaticWallet::connected("   ").is_connected());
        assert!(!StaticWallet::disconnected().is_connected());
    }
}
