/// A key and the raw value stored under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNode {
    pub key: String,
    pub value: Vec<u8>,
}

impl StoreNode {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Claim key for one instance of one app.
pub fn claim_key(app_guid: &str, instance_guid: &str) -> String {
    format!("/apps/{app_guid}/{instance_guid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_key_layout() {
        assert_eq!(claim_key("app-1", "INS-7"), "/apps/app-1/INS-7");
    }
}
