//! Label management helpers
//!
//! Lookup, get-or-create, and update-patch construction for Gmail labels.
//! Updates are modeled as a closed set of optional fields with allow-listed
//! visibility and color values rather than a free-form map, so malformed
//! update requests fail before any API call is made.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::errors::{AppError, AppResult};
use crate::gmail::{GmailClient, Label};

/// Background colors accepted by the Gmail label palette
const ALLOWED_BACKGROUND_COLORS: [&str; 24] = [
    "#ac2b16", "#cc3a21", "#eaa041", "#f2c960", "#16a766", "#43d692", "#3c78d8", "#4986e7",
    "#8e63ce", "#b99aff", "#f691b2", "#e07798", "#616161", "#a4c2f4", "#d0bcf1", "#fbc8d9",
    "#f6c5be", "#e4d7f5", "#fad165", "#fef1d1", "#c6f3de", "#a0eac9", "#c9daf8", "#b3efd3",
];

/// Text colors accepted by the Gmail label palette
const ALLOWED_TEXT_COLORS: [&str; 2] = ["#ffffff", "#000000"];

/// Closed set of updatable label fields
///
/// Fields left as `None` are not touched by the patch.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct LabelUpdate {
    /// New label name
    pub name: Option<String>,
    /// Visibility in the message list (`show` or `hide`)
    #[serde(rename = "messageListVisibility")]
    pub message_list_visibility: Option<String>,
    /// Visibility in the label list (`labelShow`, `labelHide`, `labelShowIfUnread`)
    #[serde(rename = "labelListVisibility")]
    pub label_list_visibility: Option<String>,
    /// Palette color settings
    pub color: Option<LabelColorUpdate>,
}

/// Label color settings, validated against the Gmail palette
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct LabelColorUpdate {
    /// Text color (`#ffffff` or `#000000`)
    #[serde(rename = "textColor")]
    pub text_color: Option<String>,
    /// Background color from the fixed 24-entry palette
    #[serde(rename = "backgroundColor")]
    pub background_color: Option<String>,
}

impl LabelUpdate {
    /// Build the JSON patch body for `users.labels.patch`
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if no field is set, a visibility value is not in its
    ///   allowed set, or a color is outside the Gmail palette
    pub fn to_patch(&self) -> AppResult<serde_json::Value> {
        let mut patch = serde_json::Map::new();

        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::invalid("label name must not be empty"));
            }
            patch.insert("name".to_owned(), json!(name));
        }
        if let Some(v) = &self.message_list_visibility {
            validate_message_list_visibility(v)?;
            patch.insert("messageListVisibility".to_owned(), json!(v));
        }
        if let Some(v) = &self.label_list_visibility {
            validate_label_list_visibility(v)?;
            patch.insert("labelListVisibility".to_owned(), json!(v));
        }
        if let Some(color) = &self.color {
            let mut color_patch = serde_json::Map::new();
            if let Some(text) = &color.text_color {
                if !ALLOWED_TEXT_COLORS.contains(&text.as_str()) {
                    return Err(AppError::invalid(format!("invalid textColor: {text}")));
                }
                color_patch.insert("textColor".to_owned(), json!(text));
            }
            if let Some(background) = &color.background_color {
                if !ALLOWED_BACKGROUND_COLORS.contains(&background.as_str()) {
                    return Err(AppError::invalid(format!(
                        "invalid backgroundColor: {background}"
                    )));
                }
                color_patch.insert("backgroundColor".to_owned(), json!(background));
            }
            if !color_patch.is_empty() {
                patch.insert("color".to_owned(), serde_json::Value::Object(color_patch));
            }
        }

        if patch.is_empty() {
            return Err(AppError::invalid("no valid label fields to update"));
        }
        Ok(serde_json::Value::Object(patch))
    }
}

/// Validate a message-list visibility value
pub fn validate_message_list_visibility(value: &str) -> AppResult<()> {
    if matches!(value, "show" | "hide") {
        Ok(())
    } else {
        Err(AppError::invalid(format!(
            "messageListVisibility must be 'show' or 'hide', got '{value}'"
        )))
    }
}

/// Validate a label-list visibility value
pub fn validate_label_list_visibility(value: &str) -> AppResult<()> {
    if matches!(value, "labelShow" | "labelHide" | "labelShowIfUnread") {
        Ok(())
    } else {
        Err(AppError::invalid(format!(
            "labelListVisibility must be 'labelShow', 'labelHide', or 'labelShowIfUnread', got '{value}'"
        )))
    }
}

/// Find a label by exact name
pub async fn find_label_by_name(client: &GmailClient, name: &str) -> AppResult<Option<Label>> {
    let labels = client.list_labels().await?;
    Ok(labels.into_iter().find(|l| l.name == name))
}

/// Find a label by name, or create it with the given visibility settings
pub async fn get_or_create_label(
    client: &GmailClient,
    name: &str,
    message_list_visibility: &str,
    label_list_visibility: &str,
) -> AppResult<Label> {
    if let Some(existing) = find_label_by_name(client, name).await? {
        return Ok(existing);
    }

    validate_message_list_visibility(message_list_visibility)?;
    validate_label_list_visibility(label_list_visibility)?;
    client
        .create_label(json!({
            "name": name,
            "messageListVisibility": message_list_visibility,
            "labelListVisibility": label_list_visibility,
        }))
        .await
}

#[cfg(test)]
mod tests {
    use super::{
        LabelColorUpdate, LabelUpdate, validate_label_list_visibility,
        validate_message_list_visibility,
    };

    #[test]
    fn patch_includes_only_set_fields() {
        let update = LabelUpdate {
            name: Some("Projects".to_owned()),
            label_list_visibility: Some("labelShowIfUnread".to_owned()),
            ..LabelUpdate::default()
        };
        let patch = update.to_patch().expect("must build patch");
        assert_eq!(patch["name"], "Projects");
        assert_eq!(patch["labelListVisibility"], "labelShowIfUnread");
        assert!(patch.get("messageListVisibility").is_none());
        assert!(patch.get("color").is_none());
    }

    #[test]
    fn rejects_empty_update() {
        let err = LabelUpdate::default().to_patch().expect_err("must fail");
        assert!(err.to_string().contains("no valid label fields"));
    }

    #[test]
    fn accepts_palette_colors() {
        let update = LabelUpdate {
            color: Some(LabelColorUpdate {
                text_color: Some("#ffffff".to_owned()),
                background_color: Some("#16a766".to_owned()),
            }),
            ..LabelUpdate::default()
        };
        let patch = update.to_patch().expect("must build patch");
        assert_eq!(patch["color"]["textColor"], "#ffffff");
        assert_eq!(patch["color"]["backgroundColor"], "#16a766");
    }

    #[test]
    fn rejects_color_outside_palette() {
        let update = LabelUpdate {
            color: Some(LabelColorUpdate {
                text_color: None,
                background_color: Some("#123456".to_owned()),
            }),
            ..LabelUpdate::default()
        };
        let err = update.to_patch().expect_err("must fail");
        assert!(err.to_string().contains("backgroundColor"));
    }

    #[test]
    fn rejects_unknown_visibility_values() {
        validate_message_list_visibility("show").expect("valid");
        validate_message_list_visibility("visible").expect_err("must fail");
        validate_label_list_visibility("labelHide").expect("valid");
        validate_label_list_visibility("hidden").expect_err("must fail");
    }
}
