//! Public IP detection.

use crate::error::{DdnsError, Result};
use crate::target::AddressFamily;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

const IPV4_SERVICE: &str = "https://v4.ident.me";
const IPV6_SERVICE: &str = "https://v6.ident.me";

/// Something that can tell us our current public address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressObserver: Send + Sync {
    /// Observe the public address for `family`, as text.
    async fn observe_public_address(&self, family: AddressFamily) -> Result<String>;
}

/// IP detector backed by an HTTP echo service per address family.
pub struct IpDetector {
    client: reqwest::Client,
    ipv4_service: String,
    ipv6_service: String,
}

impl IpDetector {
    /// Create a new IP detector with the default services.
    pub fn new() -> Result<Self> {
        Self::with_services(IPV4_SERVICE.to_string(), IPV6_SERVICE.to_string())
    }

    /// Create a new IP detector with custom services.
    pub fn with_services(ipv4_service: String, ipv6_service: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            ipv4_service,
            ipv6_service,
        })
    }

    fn service(&self, family: AddressFamily) -> &str {
        match family {
            AddressFamily::V4 => &self.ipv4_service,
            AddressFamily::V6 => &self.ipv6_service,
        }
    }
}

#[async_trait]
impl AddressObserver for IpDetector {
    async fn observe_public_address(&self, family: AddressFamily) -> Result<String> {
        let url = self.service(family);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DdnsError::Observer(format!("{} unreachable: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(DdnsError::Observer(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| {
                DdnsError::Observer(format!("Failed to read response from {}: {}", url, e))
            })?;
        let ip_str = text.trim();

        let ip: IpAddr = ip_str
            .parse()
            .map_err(|_| DdnsError::Observer(format!("Invalid IP response: {:?}", ip_str)))?;

        let matches_family = match family {
            AddressFamily::V4 => ip.is_ipv4(),
            AddressFamily::V6 => ip.is_ipv6(),
        };
        if !matches_family {
            return Err(DdnsError::Observer(format!(
                "{} returned {} which is not an {} address",
                url, ip, family
            )));
        }

        tracing::debug!("My {} address is {}", family, ip_str);
        Ok(ip_str.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn detector_for(server: &MockServer) -> IpDetector {
        IpDetector::with_services(
            format!("{}/v4", server.uri()),
            format!("{}/v6", server.uri()),
        )
        .unwrap()
    }

    #[test]
    fn test_default_services() {
        let detector = IpDetector::new().unwrap();
        assert_eq!(detector.service(AddressFamily::V4), "https://v4.ident.me");
        assert_eq!(detector.service(AddressFamily::V6), "https://v6.ident.me");
    }

    #[tokio::test]
    async fn test_ipv4_body_is_trimmed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.7\n"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let detector = detector_for(&mock_server);
        let ip = detector
            .observe_public_address(AddressFamily::V4)
            .await
            .unwrap();
        assert_eq!(ip, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_ipv6_uses_v6_service() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2001:db8::1"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let detector = detector_for(&mock_server);
        let ip = detector
            .observe_public_address(AddressFamily::V6)
            .await
            .unwrap();
        assert_eq!(ip, "2001:db8::1");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let detector = detector_for(&mock_server);
        let result = detector.observe_public_address(AddressFamily::V4).await;
        assert!(matches!(result, Err(DdnsError::Observer(_))));
    }

    #[tokio::test]
    async fn test_garbage_body_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let detector = detector_for(&mock_server);
        let result = detector.observe_public_address(AddressFamily::V4).await;
        assert!(matches!(result, Err(DdnsError::Observer(_))));
    }

    #[tokio::test]
    async fn test_wrong_family_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6"))
            .respond_with(ResponseTemplate::new(200).set_body_string("198.51.100.4"))
            .mount(&mock_server)
            .await;

        let detector = detector_for(&mock_server);
        let result = detector.observe_public_address(AddressFamily::V6).await;
        assert!(matches!(result, Err(DdnsError::Observer(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_observer_error() {
        let detector = IpDetector::with_services(
            "http://127.0.0.1:1/".to_string(),
            "http://127.0.0.1:1/".to_string(),
        )
        .unwrap();
        let result = detector.observe_public_address(AddressFamily::V4).await;
        match result {
            Err(DdnsError::Observer(message)) => assert!(message.contains("127.0.0.1:1")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
