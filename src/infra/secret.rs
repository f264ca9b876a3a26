//! Webhook secret loading.

use std::path::Path;

use crate::application::webhook::WebhookSecret;

use super::error::InfraError;

/// Read the webhook secret from the first line of `path`.
///
/// A missing, unreadable, or empty secret is a configuration error: the
/// server must not start without one.
pub async fn load_secret(path: &Path) -> Result<WebhookSecret, InfraError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
        InfraError::configuration(format!(
            "failed to read webhook secret `{}`: {err}",
            path.display()
        ))
    })?;

    let first_line = contents
        .split('\n')
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r');

    if first_line.is_empty() {
        return Err(InfraError::configuration(format!(
            "webhook secret `{}` is empty",
            path.display()
        )));
    }

    Ok(WebhookSecret::new(first_line))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn first_line_without_terminator_is_the_secret() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("secret.txt");
        std::fs::write(&path, "s3cr3t\r\nignored\n").expect("write");

        let secret = load_secret(&path).await.expect("secret loads");
        assert_eq!(secret.expose(), b"s3cr3t");
    }

    #[tokio::test]
    async fn missing_file_is_a_configuration_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_secret(&dir.path().join("secret.txt"))
            .await
            .expect_err("missing secret");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }

    #[tokio::test]
    async fn empty_secret_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("secret.txt");
        std::fs::write(&path, "\nsecond line\n").expect("write");

        assert!(matches!(
            load_secret(&path).await,
            Err(InfraError::Configuration { .. })
        ));
    }
}
