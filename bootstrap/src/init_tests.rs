#[cfg(test)]
mod tests {
    use crate::paths::AddonPaths;
    use crate::{BootstrapError, run};

    async fn setup(options_json: &str) -> (tempfile::TempDir, AddonPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = AddonPaths::under(dir.path());
        tokio::fs::create_dir_all(paths.data_dir()).await.unwrap();
        tokio::fs::write(paths.options_fallback(), options_json).await.unwrap();
        (dir, paths)
    }

    #[tokio::test]
    async fn init_produces_all_artifacts() {
        let (_dir, paths) = setup(r#"{"server_url": "https://vpn.example.com"}"#).await;

        run(&paths).await.unwrap();

        assert!(paths.headscale_config().is_file());
        assert!(paths.headplane_config().is_file());
        assert!(paths.acl_policy().is_file());
        let secret = tokio::fs::read_to_string(paths.cookie_secret()).await.unwrap();
        assert_eq!(secret.len(), 32);
    }

    #[tokio::test]
    async fn rerunning_init_is_stable() {
        let (_dir, paths) = setup(r#"{"server_url": "https://vpn.example.com"}"#).await;

        run(&paths).await.unwrap();
        let secret = tokio::fs::read_to_string(paths.cookie_secret()).await.unwrap();
        let config = tokio::fs::read_to_string(paths.headscale_config()).await.unwrap();
        let ui = tokio::fs::read_to_string(paths.headplane_config()).await.unwrap();

        run(&paths).await.unwrap();

        assert_eq!(
            tokio::fs::read_to_string(paths.cookie_secret()).await.unwrap(),
            secret
        );
        assert_eq!(
            tokio::fs::read_to_string(paths.headscale_config()).await.unwrap(),
            config
        );
        assert_eq!(
            tokio::fs::read_to_string(paths.headplane_config()).await.unwrap(),
            ui
        );
    }

    #[tokio::test]
    async fn existing_cookie_secret_lands_in_the_ui_document() {
        let (_dir, paths) = setup(r#"{"server_url": "https://vpn.example.com"}"#).await;
        tokio::fs::write(paths.cookie_secret(), "keepme-keepme-keepme-keepme-kee1")
            .await
            .unwrap();

        run(&paths).await.unwrap();

        let ui = tokio::fs::read_to_string(paths.headplane_config()).await.unwrap();
        assert!(ui.contains("keepme-keepme-keepme-keepme-kee1"));
    }

    #[tokio::test]
    async fn missing_server_url_fails_without_writing_documents() {
        let (_dir, paths) = setup(r#"{"listen_port": 8080}"#).await;

        let result = run(&paths).await;

        assert!(matches!(result, Err(BootstrapError::Options(_))));
        assert!(!paths.headscale_config().exists());
        assert!(!paths.headplane_config().exists());
    }
}
