//! Append-only question/answer log. Written, never read back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct InteractionLog {
    path: PathBuf,
    // serialises appends from concurrent requests
    lock: Mutex<()>,
}

impl InteractionLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One record: `Pregunta: …\nRespuesta: …\n---\n`.
    pub fn format_entry(question: &str, answer: &str) -> String {
        format!("Pregunta: {question}\nRespuesta: {answer}\n---\n")
    }

    pub fn append(&self, question: &str, answer: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        f.write_all(Self::format_entry(question, answer).as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_records_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let log = InteractionLog::new(tmp.path().join("logs/log.txt"));
        log.append("¿Qué es R-1?", "Residencial").unwrap();
        log.append("hola", "¡Hola!").unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            written,
            "Pregunta: ¿Qué es R-1?\nRespuesta: Residencial\n---\nPregunta: hola\nRespuesta: ¡Hola!\n---\n"
        );
    }
}
