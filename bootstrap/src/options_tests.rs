#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::options::{self, AddonOptions, JsonOptions, OptionSource, OptionsError};

    // ─── Helpers ───────────────────────────────────────────────────────

    fn source_from(value: serde_json::Value) -> JsonOptions {
        match value {
            serde_json::Value::Object(map) => JsonOptions::new(map),
            other => panic!("test options must be an object, got {other}"),
        }
    }

    fn full_options() -> JsonOptions {
        source_from(json!({
            "server_url": "https://vpn.example.com",
            "listen_port": 9443,
            "dns_base_domain": "mesh.example.com",
            "dns_nameservers": ["9.9.9.9", "149.112.112.112"],
            "log_level": "debug",
        }))
    }

    // ─── OptionSource semantics ────────────────────────────────────────

    #[test]
    fn scalars_are_stringified() {
        let source = source_from(json!({ "listen_port": 9443, "flag": true }));
        assert_eq!(source.get("listen_port"), Some("9443".to_string()));
        assert_eq!(source.get("flag"), Some("true".to_string()));
    }

    #[test]
    fn null_and_absent_keys_read_as_none() {
        let source = source_from(json!({ "empty": null }));
        assert_eq!(source.get("empty"), None);
        assert_eq!(source.get("missing"), None);
        assert_eq!(source.get_list("missing"), None);
    }

    #[test]
    fn lists_preserve_document_order() {
        let source = source_from(json!({ "ns": ["8.8.8.8", "1.1.1.1", "9.9.9.9"] }));
        assert_eq!(
            source.get_list("ns"),
            Some(vec![
                "8.8.8.8".to_string(),
                "1.1.1.1".to_string(),
                "9.9.9.9".to_string()
            ])
        );
    }

    #[test]
    fn quoted_and_unquoted_port_are_equivalent() {
        // The live API and the static document may disagree on JSON types
        // for the same option; the source must erase the difference.
        let quoted = source_from(json!({ "server_url": "https://a.example", "listen_port": "9443" }));
        let unquoted = source_from(json!({ "server_url": "https://a.example", "listen_port": 9443 }));
        let a = AddonOptions::from_source(&quoted).unwrap();
        let b = AddonOptions::from_source(&unquoted).unwrap();
        assert_eq!(a.listen_port(), b.listen_port());
    }

    // ─── AddonOptions parsing ──────────────────────────────────────────

    #[test]
    fn parses_every_field() {
        let opts = AddonOptions::from_source(&full_options()).unwrap();
        assert_eq!(opts.server_url(), "https://vpn.example.com");
        assert_eq!(opts.listen_port(), 9443);
        assert_eq!(opts.dns_base_domain(), "mesh.example.com");
        assert_eq!(opts.dns_nameservers(), &["9.9.9.9", "149.112.112.112"]);
        assert_eq!(opts.log_level(), "debug");
    }

    #[test]
    fn defaults_fill_every_optional_field() {
        let source = source_from(json!({ "server_url": "https://vpn.example.com" }));
        let opts = AddonOptions::from_source(&source).unwrap();
        assert_eq!(opts.listen_port(), 8080);
        assert_eq!(opts.dns_base_domain(), "tailnet.local");
        assert_eq!(opts.dns_nameservers(), &["1.1.1.1", "1.0.0.1"]);
        assert_eq!(opts.log_level(), "info");
    }

    #[test]
    fn missing_server_url_is_fatal() {
        let source = source_from(json!({ "listen_port": 8080 }));
        assert!(matches!(
            AddonOptions::from_source(&source),
            Err(OptionsError::MissingServerUrl)
        ));
    }

    #[test]
    fn empty_server_url_is_fatal() {
        let source = source_from(json!({ "server_url": "" }));
        assert!(matches!(
            AddonOptions::from_source(&source),
            Err(OptionsError::MissingServerUrl)
        ));
    }

    #[test]
    fn server_url_without_scheme_is_rejected() {
        let source = source_from(json!({ "server_url": "vpn.example.com" }));
        assert!(matches!(
            AddonOptions::from_source(&source),
            Err(OptionsError::InvalidServerUrl(_))
        ));
    }

    #[test]
    fn malformed_listen_port_falls_back_silently() {
        let source = source_from(json!({
            "server_url": "https://vpn.example.com",
            "listen_port": "not-a-port",
        }));
        let opts = AddonOptions::from_source(&source).unwrap();
        assert_eq!(opts.listen_port(), 8080);
    }

    #[test]
    fn unknown_log_level_passes_through_verbatim() {
        let source = source_from(json!({
            "server_url": "https://vpn.example.com",
            "log_level": "chatty",
        }));
        let opts = AddonOptions::from_source(&source).unwrap();
        assert_eq!(opts.log_level(), "chatty");
    }

    #[test]
    fn empty_nameserver_list_is_kept_empty() {
        let source = source_from(json!({
            "server_url": "https://vpn.example.com",
            "dns_nameservers": [],
        }));
        let opts = AddonOptions::from_source(&source).unwrap();
        assert!(opts.dns_nameservers().is_empty());
    }

    // ─── Static document source ────────────────────────────────────────

    #[tokio::test]
    async fn reads_options_from_static_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        tokio::fs::write(
            &path,
            r#"{"server_url": "https://vpn.example.com", "listen_port": 8443}"#,
        )
        .await
        .unwrap();

        let source = options::read_options_file(&path).await.unwrap();
        let opts = AddonOptions::from_source(&source).unwrap();
        assert_eq!(opts.server_url(), "https://vpn.example.com");
        assert_eq!(opts.listen_port(), 8443);
    }

    #[tokio::test]
    async fn missing_document_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = options::read_options_file(&dir.path().join("options.json")).await;
        assert!(matches!(result, Err(OptionsError::Io(_))));
    }

    #[tokio::test]
    async fn non_object_document_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        tokio::fs::write(&path, "[1, 2, 3]").await.unwrap();
        let result = options::read_options_file(&path).await;
        assert!(matches!(result, Err(OptionsError::Parse(_))));
    }
}
