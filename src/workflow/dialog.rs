use super::prompt::OpenDialogOptions;

/// Kind of artifact picked when adding a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentKind {
    /// A single archive file
    File,
    /// An unpacked folder
    Exploded,
    /// Anything else; the picker allows both files and folders
    Other(String),
}

/// Kinds offered when the platform picker cannot select files and folders at
/// the same time.
pub const KIND_CHOICES: [&str; 2] = ["File", "Exploded"];

/// Kind used where one picker can select both files and folders.
pub const COMBINED_KIND: &str = "file or exploded";

impl DeploymentKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "File" => DeploymentKind::File,
            "Exploded" => DeploymentKind::Exploded,
            other => DeploymentKind::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DeploymentKind::File => "File",
            DeploymentKind::Exploded => "Exploded",
            DeploymentKind::Other(name) => name,
        }
    }

    /// Picker shape for this kind. Never multi-select.
    pub fn dialog_options(&self) -> OpenDialogOptions {
        let (can_select_files, can_select_folders) = match self {
            DeploymentKind::File => (true, false),
            DeploymentKind::Exploded => (false, true),
            DeploymentKind::Other(_) => (true, true),
        };
        OpenDialogOptions {
            can_select_files,
            can_select_folders,
            can_select_many: false,
            open_label: format!("Select {} Deployment", self.name()),
        }
    }
}

/// Whether the kind must be asked for before opening the picker.
pub fn kind_choice_required() -> bool {
    !cfg!(target_os = "macos")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_table() {
        let file = DeploymentKind::File.dialog_options();
        assert!(file.can_select_files && !file.can_select_folders);
        assert_eq!(file.open_label, "Select File Deployment");

        let exploded = DeploymentKind::Exploded.dialog_options();
        assert!(!exploded.can_select_files && exploded.can_select_folders);
        assert_eq!(exploded.open_label, "Select Exploded Deployment");

        let combined = DeploymentKind::parse(COMBINED_KIND).dialog_options();
        assert!(combined.can_select_files && combined.can_select_folders);
        assert_eq!(combined.open_label, "Select file or exploded Deployment");

        for kind in ["File", "Exploded", "Jar"] {
            assert!(!DeploymentKind::parse(kind).dialog_options().can_select_many);
        }
    }

    #[test]
    fn test_parse_round_trips_names() {
        assert_eq!(DeploymentKind::parse("File"), DeploymentKind::File);
        assert_eq!(DeploymentKind::parse("Exploded").name(), "Exploded");
        assert_eq!(
            DeploymentKind::parse("war"),
            DeploymentKind::Other("war".to_string())
        );
    }
}
