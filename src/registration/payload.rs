use crate::error::RegistrationError;
use crate::identity::DeviceIdentity;
use serde::Serialize;

/// JSON body announcing this device: `{"type":"scanner","name":...,"id":...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    #[serde(rename = "type")]
    kind: &'static str,
    name: String,
    id: String,
}

impl NotificationPayload {
    pub const DEVICE_TYPE: &'static str = "scanner";

    pub fn new<S: Into<String>>(name: S, identity: &DeviceIdentity) -> Self {
        Self {
            kind: Self::DEVICE_TYPE,
            name: name.into(),
            id: identity.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn to_json(&self) -> Result<Vec<u8>, RegistrationError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_payload_json() {
        let uuid = Uuid::parse_str("3f2b8c1e-9a4d-4e6f-8b7a-1c2d3e4f5a6b").unwrap();
        let payload = NotificationPayload::new("Acme X1", &DeviceIdentity::from_uuid(uuid));

        let json = String::from_utf8(payload.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"type":"scanner","name":"Acme X1","id":"3f2b8c1e-9a4d-4e6f-8b7a-1c2d3e4f5a6b"}"#
        );
    }

    #[test]
    fn test_payload_escapes_name() {
        let payload = NotificationPayload::new("Quote \"Cam\"", &DeviceIdentity::generate());
        let value: serde_json::Value = serde_json::from_slice(&payload.to_json().unwrap()).unwrap();
        assert_eq!(value["name"], "Quote \"Cam\"");
        assert_eq!(value["type"], "scanner");
    }
}
