use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicePrefs {
    pub speak_replies: bool,
    pub voice_id: String,
}

impl Default for VoicePrefs {
    fn default() -> Self {
        Self {
            speak_replies: true,
            voice_id: "nova".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserSettings {
    voice: VoicePrefs,
    reprompt_message: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            voice: VoicePrefs::default(),
            reprompt_message: "Sorry, I didn't catch that. Could you say it again?".into(),
        }
    }
}

/// JSON-file backed user preferences for the assistant shell.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn voice(&self) -> VoicePrefs {
        self.data.read().unwrap().voice.clone()
    }

    pub fn reprompt_message(&self) -> String {
        self.data.read().unwrap().reprompt_message.clone()
    }

    pub fn update_voice(&self, prefs: VoicePrefs) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.voice = prefs;
            self.persist(&guard)?;
        }
        Ok(())
    }

    pub fn update_reprompt_message(&self, message: String) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.reprompt_message = message;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("preptalk-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let store = SettingsStore::new(temp_path()).unwrap();
        assert!(store.voice().speak_replies);
        assert_eq!(store.voice().voice_id, "nova");
    }

    #[test]
    fn updates_persist_and_reload() {
        let path = temp_path();
        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_voice(VoicePrefs {
                speak_replies: false,
                voice_id: "alloy".into(),
            })
            .unwrap();
        store.update_reprompt_message("Come again?".into()).unwrap();

        let reloaded = SettingsStore::new(path.clone()).unwrap();
        assert!(!reloaded.voice().speak_replies);
        assert_eq!(reloaded.voice().voice_id, "alloy");
        assert_eq!(reloaded.reprompt_message(), "Come again?");
        let _ = fs::remove_file(path);
    }
}
