//! Read-only web transport (`Web`).
//!
//! Mountpoints using it are forced read-only and route plain `http://` and
//! `https://` URLs. Only `url` is served.

use async_trait::async_trait;

use crate::vfs::error::VfsResult;
use crate::vfs::mountpoint::{MountpointParams, MountpointSnapshot};
use crate::vfs::path::{PathMatcher, inner_path};
use crate::vfs::transport::VfsTransport;
use crate::vfs::types::RequestOptions;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebTransport;

impl WebTransport {
    /// Transport name.
    pub const NAME: &'static str = "Web";
}

#[async_trait]
impl VfsTransport for WebTransport {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn defaults(&self, params: &mut MountpointParams) {
        params.read_only = true;
        params.matcher = Some(PathMatcher::schemes(["http", "https"]));
    }

    /// With an `options.url` base the path is resolved against it,
    /// otherwise the path already is the URL.
    async fn url(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<String> {
        Ok(match mount.options.get_str("url") {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), inner_path(path)),
            None => path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::error::VfsError;

    #[test]
    fn test_defaults_force_read_only() {
        let mut params = MountpointParams::new("web", WebTransport::NAME);
        WebTransport.defaults(&mut params);
        assert!(params.read_only);
        let matcher = params.matcher.unwrap();
        assert!(matcher.matches("https://example.org/a.png"));
        assert!(matcher.matches("http://example.org/"));
        assert!(!matcher.matches("web:///a"));
    }

    #[tokio::test]
    async fn test_url() {
        let opts = RequestOptions::new();
        let plain = MountpointSnapshot::for_tests("web", WebTransport::NAME);
        assert_eq!(
            WebTransport
                .url("https://example.org/a.png", &opts, &plain)
                .await
                .unwrap(),
            "https://example.org/a.png"
        );

        let mut params = MountpointParams::new("cdn", WebTransport::NAME);
        params
            .options
            .extra
            .insert("url".into(), "https://cdn.example.org/".into());
        let based = MountpointSnapshot::from(&params);
        assert_eq!(
            WebTransport.url("cdn:///img/a.png", &opts, &based).await.unwrap(),
            "https://cdn.example.org/img/a.png"
        );

        let result = WebTransport.read("https://example.org/a", &opts, &plain).await;
        assert!(matches!(result, Err(VfsError::Unavailable)));
    }
}
