use crate::domain::contract::Contract;
use crate::error::Result;
use crate::infrastructure::http::ApiEnvelope;
use serde::Deserialize;
use std::io::Read;

#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Plain(Vec<Contract>),
    Envelope(ApiEnvelope<Vec<Contract>>),
}

/// Reads a saved list of contracts.
///
/// Accepts either a bare JSON array of contracts or a response body saved
/// from the receivables endpoint (`{"success": true, "data": [...]}`).
pub struct SnapshotReader<R: Read> {
    source: R,
}

impl<R: Read> SnapshotReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn contracts(self) -> Result<Vec<Contract>> {
        match serde_json::from_reader(self.source)? {
            Snapshot::Plain(contracts) => Ok(contracts),
            Snapshot::Envelope(envelope) => Ok(envelope.into_result()?.unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaymentError;

    #[test]
    fn test_reads_plain_array() {
        let data = r#"[{"MaHD": "TC001", "HoTen": "A", "LichSuTraLai": []}]"#;
        let contracts = SnapshotReader::new(data.as_bytes()).contracts().unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].contract_id, "TC001");
    }

    #[test]
    fn test_reads_saved_response() {
        let data = r#"{"success": true, "data": [{"MaHD": "TG001"}, {"MaHD": "TC002"}], "message": "ok"}"#;
        let contracts = SnapshotReader::new(data.as_bytes()).contracts().unwrap();
        assert_eq!(contracts.len(), 2);
    }

    #[test]
    fn test_rejected_response_is_an_error() {
        let data = r#"{"success": false, "data": null, "message": "Lỗi máy chủ"}"#;
        let result = SnapshotReader::new(data.as_bytes()).contracts();
        assert!(matches!(result, Err(PaymentError::RemoteRejected(m)) if m == "Lỗi máy chủ"));
    }

    #[test]
    fn test_malformed_snapshot() {
        let result = SnapshotReader::new("{not json".as_bytes()).contracts();
        assert!(result.is_err());
    }
}
