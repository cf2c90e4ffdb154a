use crate::domain::contract::{Contract, ContractKind};
use crate::domain::money::Amount;
use crate::domain::period::PaymentPeriod;
use crate::domain::ports::ContractRepository;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const CREDIT_PATH: &str = "/tin-chap";
const INSTALLMENT_PATH: &str = "/tra-gop";
const PAYMENT_HISTORY_PATH: &str = "/lich-su-tra-lai";
const RECEIVABLES_PATH: &str = "/no-phai-thu";

/// Response wrapper used by every endpoint of the payment service.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// The service's own explanation, preferring `message` over `error`.
    pub fn rejection_message(&self) -> String {
        [&self.message, &self.error]
            .into_iter()
            .flatten()
            .map(|m| m.trim())
            .find(|m| !m.is_empty())
            .unwrap_or("Request rejected")
            .to_string()
    }

    pub fn into_result(self) -> Result<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(PaymentError::RemoteRejected(self.rejection_message()))
        }
    }
}

/// Maps a raw response to the envelope payload.
///
/// Non-2xx statuses still carry an envelope most of the time; its message is
/// surfaced as-is, falling back to the HTTP status.
pub fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
            .map(|envelope| envelope.rejection_message())
            .unwrap_or_else(|_| format!("HTTP {status}"));
        return Err(PaymentError::RemoteRejected(message));
    }
    serde_json::from_str::<ApiEnvelope<T>>(body)?.into_result()
}

/// `ContractRepository` backed by the payment service's REST API.
#[derive(Clone)]
pub struct HttpContractRepository {
    client: Client,
    base_url: String,
}

impl HttpContractRepository {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn contract_path(contract_id: &str) -> Result<String> {
        match ContractKind::from_contract_id(contract_id) {
            ContractKind::Credit => Ok(format!("{CREDIT_PATH}/{contract_id}")),
            ContractKind::Installment => Ok(format!("{INSTALLMENT_PATH}/{contract_id}")),
            ContractKind::Other => Err(PaymentError::UnsupportedContractKind(contract_id.to_string())),
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "payment service responded");
        decode_response(status, &body).inspect_err(|e| {
            if let PaymentError::RemoteRejected(message) = e {
                warn!(status, %message, "payment service rejected request");
            }
        })
    }
}

#[async_trait]
impl ContractRepository for HttpContractRepository {
    async fn fetch_contract(&self, contract_id: &str) -> Result<Contract> {
        let path = Self::contract_path(contract_id)?;
        self.send::<Contract>(self.client.get(self.url(&path)))
            .await?
            .ok_or_else(|| PaymentError::ContractNotFound(contract_id.to_string()))
    }

    async fn fetch_periods(&self, contract_id: &str) -> Result<Vec<PaymentPeriod>> {
        Ok(self.fetch_contract(contract_id).await?.periods)
    }

    async fn fetch_receivables(&self, today: NaiveDate) -> Result<Vec<Contract>> {
        debug!(%today, "fetching receivables");
        let request = self
            .client
            .get(self.url(RECEIVABLES_PATH))
            .query(&[("time", "today")]);
        Ok(self.send::<Vec<Contract>>(request).await?.unwrap_or_default())
    }

    async fn pay_period(&self, contract_id: &str, sequence: u32, amount: Amount) -> Result<PaymentPeriod> {
        let request = self
            .client
            .post(self.url(&format!("{PAYMENT_HISTORY_PATH}/pay/{sequence}")))
            .query(&[("so_tien", amount.value().to_string())]);
        let data = self.send::<serde_json::Value>(request).await?;

        // Some backends echo the updated period, others only acknowledge.
        if let Some(period) = data.and_then(|v| serde_json::from_value::<PaymentPeriod>(v).ok()) {
            return Ok(period);
        }
        self.fetch_periods(contract_id)
            .await?
            .into_iter()
            .find(|p| p.sequence == sequence)
            .ok_or_else(|| PaymentError::PeriodNotFound {
                contract_id: contract_id.to_string(),
                sequence,
            })
    }

    async fn pay_contract_full(&self, contract_id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("{PAYMENT_HISTORY_PATH}/pay-full/{contract_id}")));
        self.send::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn pay_principal(&self, contract_id: &str, amount: Amount) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("{CREDIT_PATH}/tra-goc/{contract_id}")))
            .query(&[("so_tien_tra_goc", amount.value().to_string())]);
        self.send::<serde_json::Value>(request).await?;
        Ok(())
    }

    /// Deletes the contract, then its payment schedule.
    ///
    /// The service does not cascade on its own; the schedule is removed only
    /// once the contract delete has been accepted.
    async fn delete_contract(&self, contract_id: &str) -> Result<()> {
        let path = Self::contract_path(contract_id)?;
        self.send::<serde_json::Value>(self.client.delete(self.url(&path)))
            .await?;

        let schedule_path = format!("{PAYMENT_HISTORY_PATH}/contract/{contract_id}");
        self.send::<serde_json::Value>(self.client.delete(self.url(&schedule_path)))
            .await?;
        debug!(contract_id, "contract and schedule deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_decode_success_envelope() {
        let body = r#"{"success": true, "data": {"Stt": 3, "Ngay": "2025-03-10", "SoTien": 100}, "message": null, "error": null}"#;
        let period: PaymentPeriod = decode_response(200, body).unwrap().unwrap();
        assert_eq!(period.sequence, 3);
    }

    #[test]
    fn test_decode_rejection_keeps_message_verbatim() {
        let body = r#"{"success": false, "data": null, "message": "Hợp đồng đã tất toán", "error": null}"#;
        let result = decode_response::<serde_json::Value>(200, body);
        assert!(matches!(
            result,
            Err(PaymentError::RemoteRejected(m)) if m == "Hợp đồng đã tất toán"
        ));
    }

    #[test]
    fn test_decode_rejection_falls_back_to_error_field() {
        let body = r#"{"success": false, "message": "  ", "error": "not found"}"#;
        assert!(matches!(
            decode_response::<serde_json::Value>(200, body),
            Err(PaymentError::RemoteRejected(m)) if m == "not found"
        ));
    }

    #[test]
    fn test_decode_http_error_status() {
        assert!(matches!(
            decode_response::<serde_json::Value>(502, "<html>bad gateway</html>"),
            Err(PaymentError::RemoteRejected(m)) if m == "HTTP 502"
        ));
        let body = r#"{"success": false, "message": "Không tìm thấy hợp đồng"}"#;
        assert!(matches!(
            decode_response::<serde_json::Value>(404, body),
            Err(PaymentError::RemoteRejected(m)) if m == "Không tìm thấy hợp đồng"
        ));
    }

    #[test]
    fn test_decode_malformed_body() {
        assert!(matches!(
            decode_response::<serde_json::Value>(200, "not json"),
            Err(PaymentError::Json(_))
        ));
    }

    #[test]
    fn test_contract_path_by_kind() {
        assert_eq!(HttpContractRepository::contract_path("TC001").unwrap(), "/tin-chap/TC001");
        assert_eq!(HttpContractRepository::contract_path("TG001").unwrap(), "/tra-gop/TG001");
        assert!(HttpContractRepository::contract_path("X1").is_err());
    }

    /// Minimal HTTP/1.1 endpoint answering every request with `body`,
    /// recording request lines.
    async fn fake_service(body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf[read..]).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    read += n;
                }
                let request = String::from_utf8_lossy(&buf[..read]);
                let line = request.lines().next().unwrap_or_default().to_string();
                log.lock().unwrap().push(line);

                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
        });

        (format!("http://{addr}"), seen)
    }

    #[tokio::test]
    async fn test_delete_removes_contract_then_schedule() {
        let (url, seen) = fake_service(r#"{"success": true, "data": null}"#).await;
        let repo = HttpContractRepository::new(url, Duration::from_secs(5)).unwrap();

        repo.delete_contract("TG005").await.unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                "DELETE /tra-gop/TG005 HTTP/1.1".to_string(),
                "DELETE /lich-su-tra-lai/contract/TG005 HTTP/1.1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_delete_keeps_schedule() {
        let (url, seen) =
            fake_service(r#"{"success": false, "data": null, "message": "Không thể xoá"}"#).await;
        let repo = HttpContractRepository::new(url, Duration::from_secs(5)).unwrap();

        assert!(matches!(
            repo.delete_contract("TC005").await,
            Err(PaymentError::RemoteRejected(m)) if m == "Không thể xoá"
        ));
        assert_eq!(*seen.lock().unwrap(), vec!["DELETE /tin-chap/TC005 HTTP/1.1".to_string()]);
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        // Port 9 (discard) is closed on test hosts; the request fails at transport level.
        let repo = HttpContractRepository::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            repo.pay_contract_full("TC001").await,
            Err(PaymentError::NetworkError(_))
        ));
    }
}
