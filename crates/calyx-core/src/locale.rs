//! User-visible strings.
//!
//! The backend answers in Spanish, so Spanish is the default. Nutrition data formatting
//! (`food` module) is always Spanish because it mirrors the backend's own field names.

use serde::{Deserialize, Serialize};

use crate::api::ModelState;
use crate::state::ChatRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    pub fn timeout(self) -> &'static str {
        match self {
            Locale::Es => {
                "El servidor está tardando demasiado en responder. Intenta de nuevo más tarde."
            }
            Locale::En => "The server is taking too long to respond. Please try again later.",
        }
    }

    pub fn connection_error(self) -> &'static str {
        match self {
            Locale::Es => "Error de conexión con el backend.",
            Locale::En => "Could not connect to the backend.",
        }
    }

    pub fn unexpected_error(self) -> &'static str {
        match self {
            Locale::Es => "Error inesperado en el frontend.",
            Locale::En => "Unexpected client error.",
        }
    }

    pub fn food_backend_error(self) -> &'static str {
        match self {
            Locale::Es => "Error de conexión con el backend de alimentos.",
            Locale::En => "Could not connect to the food backend.",
        }
    }

    pub fn no_response(self) -> &'static str {
        match self {
            Locale::Es => "(Sin respuesta)",
            Locale::En => "(No response)",
        }
    }

    pub fn cannot_connect(self) -> &'static str {
        match self {
            Locale::Es => {
                "No se puede conectar con el backend. Asegúrate de que el servidor esté ejecutándose en el puerto 8000."
            }
            Locale::En => {
                "Cannot reach the backend. Make sure the server is running on port 8000."
            }
        }
    }

    pub fn model_switch_error(self, error: &str) -> String {
        match self {
            Locale::Es => format!("Error al cambiar modelo: {}", error),
            Locale::En => format!("Could not switch model: {}", error),
        }
    }

    pub fn model_switch_connection_error(self) -> &'static str {
        match self {
            Locale::Es => {
                "Error de conexión al cambiar modelo. Verifica que el backend esté funcionando."
            }
            Locale::En => "Connection error while switching model. Check that the backend is running.",
        }
    }

    pub fn model_switched(self, label: &str) -> String {
        match self {
            Locale::Es => format!("Modelo cambiado a {}.", label),
            Locale::En => format!("Switched model to {}.", label),
        }
    }

    pub fn backend_exited(self, detail: &str) -> String {
        match self {
            Locale::Es => format!("El backend se detuvo inesperadamente ({}).", detail),
            Locale::En => format!("The backend stopped unexpectedly ({}).", detail),
        }
    }

    pub fn backend_spawn_failed(self, detail: &str) -> String {
        match self {
            Locale::Es => format!("No se pudo iniciar el backend: {}", detail),
            Locale::En => format!("Failed to start the backend: {}", detail),
        }
    }

    pub fn parse_error(self) -> &'static str {
        match self {
            Locale::Es => "Error de análisis: se muestra el texto original",
            Locale::En => "Parse error: showing the original text",
        }
    }

    pub fn welcome_title(self) -> &'static str {
        match self {
            Locale::Es => "Bienvenido a Calyx AI",
            Locale::En => "Welcome to Calyx AI",
        }
    }

    pub fn welcome_subtitle(self) -> &'static str {
        match self {
            Locale::Es => "¿En qué puedo asistirte hoy?",
            Locale::En => "How can I help you today?",
        }
    }

    pub fn placeholder_switching(self) -> &'static str {
        match self {
            Locale::Es => "Cambiando modelo...",
            Locale::En => "Switching model...",
        }
    }

    pub fn placeholder_processing(self) -> &'static str {
        match self {
            Locale::Es => "Procesando respuesta...",
            Locale::En => "Processing response...",
        }
    }

    pub fn placeholder_typing(self) -> &'static str {
        match self {
            Locale::Es => "Desglosando cálculos...",
            Locale::En => "Working through the calculation...",
        }
    }

    pub fn placeholder_idle(self) -> &'static str {
        match self {
            Locale::Es => "Escribe tu mensaje...",
            Locale::En => "Type your message...",
        }
    }

    /// Speaker label shown above each message in the transcript.
    pub fn role_label(self, role: ChatRole) -> &'static str {
        match (self, role) {
            (Locale::Es, ChatRole::User) => "Tú:",
            (Locale::En, ChatRole::User) => "You:",
            (_, ChatRole::Assistant) => "Calyx:",
        }
    }

    pub fn thinking_label(self) -> &'static str {
        match self {
            Locale::Es => "Razonamiento",
            Locale::En => "Thinking",
        }
    }

    pub fn startup_step(self, elapsed_secs: u64) -> &'static str {
        match (self, elapsed_secs) {
            (Locale::Es, 0..=9) => "Iniciando backend...",
            (Locale::Es, 10..=19) => "Cargando Python y dependencias...",
            (Locale::Es, _) => "Preparando modelo de IA...",
            (Locale::En, 0..=9) => "Starting backend...",
            (Locale::En, 10..=19) => "Loading Python and dependencies...",
            (Locale::En, _) => "Preparing AI model...",
        }
    }

    pub fn startup_failed(self) -> (&'static str, &'static str) {
        match self {
            Locale::Es => (
                "Error al conectar con el backend",
                "El backend no responde después de 30 segundos",
            ),
            Locale::En => (
                "Could not connect to the backend",
                "The backend has not responded after 30 seconds",
            ),
        }
    }

    /// Short label for the header status badge.
    pub fn model_state(self, state: ModelState) -> &'static str {
        match (self, state) {
            (Locale::Es, ModelState::Checking) => "Verificando",
            (Locale::Es, ModelState::NotDownloaded) => "No descargado",
            (Locale::Es, ModelState::Loading) => "Cargando",
            (Locale::Es, ModelState::Ready) => "Listo",
            (Locale::Es, ModelState::Error) => "Error",
            (Locale::Es, ModelState::Unknown) => "Desconocido",
            (Locale::En, ModelState::Checking) => "Checking",
            (Locale::En, ModelState::NotDownloaded) => "Not downloaded",
            (Locale::En, ModelState::Loading) => "Loading",
            (Locale::En, ModelState::Ready) => "Ready",
            (Locale::En, ModelState::Error) => "Error",
            (Locale::En, ModelState::Unknown) => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_spanish() {
        assert_eq!(Locale::default(), Locale::Es);
        assert_eq!(Locale::default().no_response(), "(Sin respuesta)");
        assert_eq!(Locale::En.no_response(), "(No response)");
    }

    #[test]
    fn test_startup_steps_by_elapsed() {
        assert_eq!(Locale::Es.startup_step(0), "Iniciando backend...");
        assert_eq!(Locale::Es.startup_step(12), "Cargando Python y dependencias...");
        assert_eq!(Locale::Es.startup_step(45), "Preparando modelo de IA...");
    }

    #[test]
    fn test_serde_names() {
        let locale: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(locale, Locale::En);
        assert_eq!(serde_json::to_string(&Locale::Es).unwrap(), "\"es\"");
    }

    #[test]
    fn test_model_state_labels() {
        assert_eq!(Locale::Es.model_state(ModelState::Ready), "Listo");
        assert_eq!(Locale::En.model_state(ModelState::NotDownloaded), "Not downloaded");
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Locale::Es.role_label(ChatRole::User), "Tú:");
        assert_eq!(Locale::En.role_label(ChatRole::User), "You:");
        assert_eq!(Locale::En.role_label(ChatRole::Assistant), "Calyx:");
    }
}
