use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use calyx_core::api::{ChatReply, ClientError, FoodLookup};
use calyx_core::chat::execute;
use calyx_core::{ChatBackend, ChatController, ChatRole, ChatSession, Locale, MessageBody};

/// In-process backend with canned answers.
#[derive(Default)]
struct FakeBackend {
    delay: Option<Duration>,
    fail_with: Option<fn() -> ClientError>,
    reply: ChatReply,
    food: FoodLookup,
    prompts: std::sync::Mutex<Vec<String>>,
    food_queries: std::sync::Mutex<Vec<String>>,
    calls: AtomicUsize,
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn chat(&self, prompt: &str) -> Result<ChatReply, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail_with {
            Some(make_err) => Err(make_err()),
            None => Ok(self.reply.clone()),
        }
    }

    async fn lookup_food(&self, query: &str) -> Result<FoodLookup, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.food_queries.lock().unwrap().push(query.to_string());
        match self.fail_with {
            Some(make_err) => Err(make_err()),
            None => Ok(self.food.clone()),
        }
    }
}

fn controller(backend: FakeBackend) -> (ChatController<FakeBackend>, Arc<FakeBackend>) {
    let backend = Arc::new(backend);
    let controller = ChatController::new(backend.clone(), Duration::from_secs(600), Locale::Es);
    (controller, backend)
}

#[tokio::test]
async fn test_blank_input_is_a_no_op() {
    let (mut chat, backend) = controller(FakeBackend::default());
    assert!(!chat.send("").await);
    assert!(!chat.send("   \n\t").await);
    assert!(chat.messages().is_empty());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_round_trip_appends_user_then_assistant() {
    let (mut chat, backend) = controller(FakeBackend {
        reply: ChatReply {
            message: Some("Hola, soy Calyx.".to_string()),
            ..Default::default()
        },
        ..Default::default()
    });

    assert!(chat.send("hola").await);
    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[1].role, ChatRole::Assistant);
    assert_eq!(messages[1].raw_text(), "Hola, soy Calyx.");
    assert!(!chat.session().is_processing());

    assert!(chat.send("¿y tú?").await);
    let prompts = backend.prompts.lock().unwrap();
    assert_eq!(prompts[0], "user: hola");
    assert_eq!(prompts[1], "user: hola\nai: Hola, soy Calyx.\nuser: ¿y tú?");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_appends_one_message_and_resets() {
    let (mut chat, _backend) = controller(FakeBackend {
        delay: Some(Duration::from_secs(700)),
        ..Default::default()
    });

    assert!(chat.send("calcula mi IMC").await);
    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[1].raw_text(),
        "El servidor está tardando demasiado en responder. Intenta de nuevo más tarde."
    );
    assert!(!chat.session().is_processing());
}

#[tokio::test]
async fn test_connection_failure_message() {
    let (mut chat, _backend) = controller(FakeBackend {
        fail_with: Some(|| ClientError::Connection("refused".to_string())),
        ..Default::default()
    });

    chat.send("hola").await;
    assert_eq!(chat.messages()[1].raw_text(), "Error de conexión con el backend.");
}

#[tokio::test]
async fn test_missing_fields_give_placeholder() {
    let (mut chat, _backend) = controller(FakeBackend::default());
    chat.send("hola").await;
    assert_eq!(chat.messages().len(), 2);
    assert_eq!(chat.messages()[1].raw_text(), "(Sin respuesta)");
}

#[tokio::test]
async fn test_second_send_rejected_while_in_flight() {
    let backend = FakeBackend {
        reply: ChatReply {
            message: Some("primera respuesta".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut session = ChatSession::new();

    let request = session.begin("primera").unwrap();
    assert!(session.is_processing());
    assert!(session.begin("segunda").is_none());
    assert_eq!(session.messages().len(), 1);

    let replies = execute(&backend, request, Duration::from_secs(600), Locale::Es).await;
    session.complete(replies);
    assert_eq!(session.messages().len(), 2);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert!(!session.is_processing());
    assert!(session.begin("segunda").is_some());
}

#[tokio::test]
async fn test_food_question_uses_food_endpoint() {
    let food: FoodLookup = serde_json::from_value(serde_json::json!({
        "filas": [{"clave": "energia", "valor": 265}]
    }))
    .unwrap();
    let (mut chat, backend) = controller(FakeBackend {
        food,
        ..Default::default()
    });

    chat.send("datos de pan").await;
    assert!(backend.prompts.lock().unwrap().is_empty());
    assert_eq!(*backend.food_queries.lock().unwrap(), vec!["pan".to_string()]);
    assert_eq!(chat.messages()[1].raw_text(), "Información de pan:\n- Energia: 265 kcal\n");
}

#[tokio::test]
async fn test_complete_food_question_renders_yaml() {
    let food: FoodLookup = serde_json::from_value(serde_json::json!({
        "info_completa": [{"linea": "energia: 52"}, {"linea": "id: 3"}]
    }))
    .unwrap();
    let (mut chat, backend) = controller(FakeBackend {
        food,
        ..Default::default()
    });

    chat.send("información completa de manzana").await;
    assert_eq!(
        *backend.food_queries.lock().unwrap(),
        vec!["informacion completa de manzana".to_string()]
    );
    assert_eq!(
        chat.messages()[1].body,
        MessageBody::Yaml("# Información de manzana\nenergia: 52\n".to_string())
    );
}

#[tokio::test]
async fn test_food_backend_failure_message() {
    let (mut chat, _backend) = controller(FakeBackend {
        fail_with: Some(|| ClientError::Connection("refused".to_string())),
        ..Default::default()
    });

    chat.send("datos de pan").await;
    assert_eq!(
        chat.messages()[1].raw_text(),
        "Error de conexión con el backend de alimentos."
    );
}

#[tokio::test]
async fn test_new_chat_clears_history() {
    let (mut chat, _backend) = controller(FakeBackend::default());
    chat.send("hola").await;
    chat.clear();
    assert!(chat.messages().is_empty());
}
