//! Integration tests for [`handler_chain::HandlerChain`].
//!
//! Covers: before/after order, a before hook stopping the chain, Reply ending the handle phase and
//! reaching every after hook, and errors from handle propagating to the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use handler_chain::HandlerChain;
use turtle_core::{
    Chat, Handler, HandlerError, HandlerResponse, MessageSnapshot, TurtleError, Update, UpdateKind,
    User,
};

fn create_test_update(text: &str) -> Update {
    Update {
        user: User {
            id: 123,
            username: Some("operator".to_string()),
            first_name: Some("Test".to_string()),
            last_name: None,
        },
        chat: Chat {
            id: 456,
            chat_type: "private".to_string(),
        },
        kind: UpdateKind::Message {
            message: MessageSnapshot::text(1, text),
            reply_to: None,
        },
        received_at: Utc::now(),
    }
}

struct CountingHandler {
    handle_count: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Handler for CountingHandler {
    async fn handle(&self, _update: &Update) -> turtle_core::Result<HandlerResponse> {
        self.handle_count.fetch_add(1, Ordering::SeqCst);
        Ok(HandlerResponse::Continue)
    }
}

struct OrderHandler {
    name: &'static str,
    order: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl Handler for OrderHandler {
    async fn before(&self, _update: &Update) -> turtle_core::Result<bool> {
        self.order.lock().unwrap().push(format!("before_{}", self.name));
        Ok(true)
    }

    async fn after(&self, _update: &Update, _response: &HandlerResponse) -> turtle_core::Result<()> {
        self.order.lock().unwrap().push(format!("after_{}", self.name));
        Ok(())
    }
}

/// **Test: Handlers run before in order and after in reverse.**
///
/// **Setup:** Two handlers that record "before_NAME" and "after_NAME".
/// **Expected:** before_first, before_second, after_second, after_first; response is Continue.
#[tokio::test]
async fn test_multiple_handlers_executed_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let chain = HandlerChain::new()
        .add_handler(Arc::new(OrderHandler {
            name: "first",
            order: order.clone(),
        }))
        .add_handler(Arc::new(OrderHandler {
            name: "second",
            order: order.clone(),
        }));

    let result = chain.handle(&create_test_update("hi")).await.unwrap();

    assert_eq!(result, HandlerResponse::Continue);
    assert_eq!(
        *order.lock().unwrap(),
        vec!["before_first", "before_second", "after_second", "after_first"]
    );
}

/// **Test: A before hook returning false stops the chain; handle is not run.**
#[tokio::test]
async fn test_before_false_stops_chain() {
    struct Gate;

    #[async_trait::async_trait]
    impl Handler for Gate {
        async fn before(&self, _update: &Update) -> turtle_core::Result<bool> {
            Ok(false)
        }
    }

    let handle_count = Arc::new(AtomicUsize::new(0));
    let chain = HandlerChain::new()
        .add_handler(Arc::new(Gate))
        .add_handler(Arc::new(CountingHandler {
            handle_count: handle_count.clone(),
        }));

    let result = chain.handle(&create_test_update("hi")).await.unwrap();

    assert_eq!(result, HandlerResponse::Stop);
    assert_eq!(handle_count.load(Ordering::SeqCst), 0);
}

/// **Test: Reply ends the handle phase and is passed to every after hook.**
///
/// **Setup:** Capture handler, reply handler, counting handler (must not run).
/// **Expected:** result is Reply("Done!"); capture saw it; counting handler never ran.
#[tokio::test]
async fn test_reply_stops_chain_and_passes_to_after() {
    struct ReplyHandler;

    #[async_trait::async_trait]
    impl Handler for ReplyHandler {
        async fn handle(&self, _update: &Update) -> turtle_core::Result<HandlerResponse> {
            Ok(HandlerResponse::Reply("Done!".to_string()))
        }
    }

    struct Capture {
        seen: Arc<Mutex<Option<HandlerResponse>>>,
    }

    #[async_trait::async_trait]
    impl Handler for Capture {
        async fn after(&self, _update: &Update, response: &HandlerResponse) -> turtle_core::Result<()> {
            *self.seen.lock().unwrap() = Some(response.clone());
            Ok(())
        }
    }

    let seen = Arc::new(Mutex::new(None));
    let handle_count = Arc::new(AtomicUsize::new(0));
    let chain = HandlerChain::new()
        .add_handler(Arc::new(Capture { seen: seen.clone() }))
        .add_handler(Arc::new(ReplyHandler))
        .add_handler(Arc::new(CountingHandler {
            handle_count: handle_count.clone(),
        }));

    let result = chain.handle(&create_test_update("hi")).await.unwrap();

    assert_eq!(result, HandlerResponse::Reply("Done!".to_string()));
    assert_eq!(
        *seen.lock().unwrap(),
        Some(HandlerResponse::Reply("Done!".to_string()))
    );
    assert_eq!(handle_count.load(Ordering::SeqCst), 0);
}

/// **Test: An error from handle propagates to the caller.**
#[tokio::test]
async fn test_handle_error_propagates() {
    struct Failing;

    #[async_trait::async_trait]
    impl Handler for Failing {
        async fn handle(&self, _update: &Update) -> turtle_core::Result<HandlerResponse> {
            Err(TurtleError::Handler(HandlerError::State("broken".to_string())))
        }
    }

    let chain = HandlerChain::new().add_handler(Arc::new(Failing));
    let err = chain.handle(&create_test_update("hi")).await.unwrap_err();
    assert!(err.to_string().contains("broken"));
}
