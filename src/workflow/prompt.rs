use async_trait::async_trait;
use std::path::PathBuf;

/// Shape of a file/folder picker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenDialogOptions {
    pub can_select_files: bool,
    pub can_select_folders: bool,
    pub can_select_many: bool,
    /// Label of the confirm button
    pub open_label: String,
}

/// A single line text prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputBoxOptions {
    pub prompt: String,
    pub placeholder: Option<String>,
    /// Prefilled value
    pub value: Option<String>,
    /// Mask the typed text
    pub password: bool,
}

impl InputBoxOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// The human-input surface.
///
/// Every asking method returns `None` when the user dismisses the dialog.
/// The UI layer implements this; tests use a scripted fake.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn show_open_dialog(&self, options: &OpenDialogOptions) -> Option<Vec<PathBuf>>;

    async fn show_input_box(&self, options: &InputBoxOptions) -> Option<String>;

    async fn show_quick_pick(&self, items: &[String], placeholder: &str) -> Option<String>;

    /// Transient informational message.
    fn show_info(&self, message: &str);

    /// Transient error message.
    fn show_error(&self, message: &str);
}

pub(crate) const YES: &str = "Yes";
pub(crate) const NO: &str = "No";

/// Asks a Yes/No question. `None` means the pick was dismissed.
pub(crate) async fn confirm(prompter: &dyn Prompter, question: &str) -> Option<bool> {
    let items = [NO.to_string(), YES.to_string()];
    prompter
        .show_quick_pick(&items, question)
        .await
        .map(|answer| answer == YES)
}
