use crate::error::ArtifactError;
use crate::plan::ProvisioningPlan;
use crate::stack::{Annotation, AnnotationLevel};
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// The output of one synthesis: the rendered template plus everything needed
/// to review or compare it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    pub stack_name: String,
    /// Pretty-printed template JSON. Kept as text so the binary artifact
    /// stores exactly the bytes that were fingerprinted.
    pub template: String,
    pub plan: ProvisioningPlan,
    pub annotations: Vec<Annotation>,
    /// Lowercase hex SHA-256 of `template`.
    pub fingerprint: String,
}

impl Assembly {
    pub fn template_value(&self) -> Result<Value, ArtifactError> {
        Ok(serde_json::from_str(&self.template)?)
    }

    /// A resource of the template by logical id.
    pub fn resource(&self, logical_id: &str) -> Result<Option<Value>, ArtifactError> {
        let template = self.template_value()?;
        Ok(template
            .get("Resources")
            .and_then(|resources| resources.get(logical_id))
            .cloned())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.level == AnnotationLevel::Warning)
    }

    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.stack_name)
    }

    pub fn assembly_file_name(&self) -> String {
        format!("{}.assembly.bin", self.stack_name)
    }

    /// Writes `<stack>.template.json` and `<stack>.assembly.bin` into `dir`,
    /// creating it if needed. Returns the paths written.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf), ArtifactError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

        let template_path = dir.join(self.template_file_name());
        fs::write(&template_path, format!("{}\n", self.template))
            .map_err(|e| io_error(&template_path, e))?;

        let assembly_path = dir.join(self.assembly_file_name());
        self.save(&assembly_path)?;

        log::info!(
            "Wrote {} and {}",
            template_path.display(),
            assembly_path.display()
        );
        Ok((template_path, assembly_path))
    }

    /// Saves the assembly to a file using the bincode format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|e| io_error(path, e))?;
        file.write_all(&bytes).map_err(|e| io_error(path, e))?;
        Ok(())
    }

    /// Loads an assembly previously written by [`Assembly::save`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let mut file = fs::File::open(path).map_err(|e| io_error(path, e))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| io_error(path, e))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        encode_to_vec(self, standard()).map_err(|e| ArtifactError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        decode_from_slice(bytes, standard())
            .map(|(assembly, _)| assembly)
            .map_err(|e| ArtifactError::Decode(e.to_string()))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}
