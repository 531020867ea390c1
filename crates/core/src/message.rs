// Inbound native messages

use crate::error::{Result, YanapError};
use crate::id::InstanceId;
use crate::status::WireStatus;
use serde::Deserialize;
use serde_json::Value;

/// Message received on the notification channel
#[derive(Debug, Clone, PartialEq)]
pub enum NativeMessage {
    StatusUpdate {
        audio_uid: InstanceId,
        new_status: WireStatus,
        additional_info: Option<String>,
    },
    FileLength {
        audio_uid: InstanceId,
        /// Byte length; negative means the engine could not tell
        file_length: i64,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatusUpdate {
    audio_uid: InstanceId,
    new_status: String,
    #[serde(default)]
    additional_info: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFileLength {
    audio_uid: InstanceId,
    file_length: i64,
}

impl NativeMessage {
    /// Decode one message. The `msgType` tag is checked first so an unknown
    /// type is reported as such rather than as a decoding failure.
    pub fn from_value(value: &Value) -> Result<Self> {
        let msg_type = value
            .get("msgType")
            .and_then(Value::as_str)
            .ok_or_else(|| YanapError::UnknownMessageType(value.to_string()))?;

        match msg_type {
            "statusUpdate" => {
                let raw = RawStatusUpdate::deserialize(value)?;
                Ok(NativeMessage::StatusUpdate {
                    audio_uid: raw.audio_uid,
                    new_status: WireStatus::from(raw.new_status.as_str()),
                    additional_info: raw.additional_info,
                })
            }
            "fileLength" => {
                let raw = RawFileLength::deserialize(value)?;
                Ok(NativeMessage::FileLength {
                    audio_uid: raw.audio_uid,
                    file_length: raw.file_length,
                })
            }
            _ => Err(YanapError::UnknownMessageType(value.to_string())),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn audio_uid(&self) -> &InstanceId {
        match self {
            NativeMessage::StatusUpdate { audio_uid, .. }
            | NativeMessage::FileLength { audio_uid, .. } => audio_uid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::InstanceStatus;
    use serde_json::json;

    #[test]
    fn test_status_update() {
        let msg = NativeMessage::from_value(&json!({
            "msgType": "statusUpdate",
            "audioUid": "a",
            "newStatus": "ERROR",
            "additionalInfo": "unable to load file",
        }))
        .unwrap();
        assert_eq!(
            msg,
            NativeMessage::StatusUpdate {
                audio_uid: InstanceId::new("a"),
                new_status: WireStatus::Known(InstanceStatus::Error),
                additional_info: Some("unable to load file".into()),
            }
        );
    }

    #[test]
    fn test_status_update_without_info() {
        let msg = NativeMessage::from_json(
            r#"{"msgType":"statusUpdate","audioUid":"a","newStatus":"NONE"}"#,
        )
        .unwrap();
        match msg {
            NativeMessage::StatusUpdate {
                new_status,
                additional_info,
                ..
            } => {
                assert_eq!(new_status, WireStatus::Unrecognized("NONE".into()));
                assert_eq!(additional_info, None);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_file_length() {
        let msg = NativeMessage::from_value(&json!({
            "msgType": "fileLength",
            "audioUid": "b",
            "fileLength": 4096,
        }))
        .unwrap();
        assert_eq!(msg.audio_uid().as_str(), "b");
        assert!(matches!(
            msg,
            NativeMessage::FileLength {
                file_length: 4096,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_type_is_protocol_error() {
        let err = NativeMessage::from_value(&json!({"msgType": "volume", "audioUid": "a"}))
            .unwrap_err();
        assert!(matches!(err, YanapError::UnknownMessageType(_)));

        let err = NativeMessage::from_value(&json!({"audioUid": "a"})).unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = NativeMessage::from_value(&json!({"msgType": "fileLength", "audioUid": "a"}))
            .unwrap_err();
        assert!(matches!(err, YanapError::MalformedMessage(_)));

        let err = NativeMessage::from_json("not json").unwrap_err();
        assert!(err.is_protocol());
    }
}
