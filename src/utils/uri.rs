/// Public gateway used to resolve content-addressed locators.
const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Rewrite `ipfs://<hash>` locators to a fetchable gateway URL. Anything else
/// passes through unchanged.
pub fn resolve_uri(uri: &str) -> String {
    match uri.strip_prefix("ipfs://") {
        Some(hash) => format!("{IPFS_GATEWAY}{hash}"),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_ipfs_scheme_to_gateway() {
        assert_eq!(
            resolve_uri("ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"),
            "https://ipfs.io/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
    }

    #[test]
    fn passes_http_uris_through_unchanged() {
        assert_eq!(
            resolve_uri("https://example.com/meta/42.json"),
            "https://example.com/meta/42.json"
        );
    }

    #[test]
    fn rewrites_nested_paths() {
        assert_eq!(
            resolve_uri("ipfs://QmHash/42.json"),
            "https://ipfs.io/ipfs/QmHash/42.json"
        );
    }
}
