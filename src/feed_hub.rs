// src/feed_hub.rs
//
// In-process event hub for the real-time feed. WebSocket sessions register
// per user id; mutation handlers publish notification events and listing
// revalidation signals through the hub. Sessions unsubscribe by sending
// Disconnect when the socket closes.

use actix::prelude::*;
use log::info;
use serde_json::json;
use std::collections::HashMap;

/// Text frame pushed down a single feed socket.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct FeedPush {
    pub payload: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub user_id: String,
    pub addr: Recipient<FeedPush>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub user_id: String,
    pub addr: Recipient<FeedPush>,
}

/// A notification-style event; `user_id: None` goes to every session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct FeedEvent {
    pub user_id: Option<String>,
    pub payload: String,
}

/// Cache-invalidation signal fired after listing mutations. Dashboards
/// subscribed to a listing collection refetch on receipt.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Revalidate {
    pub collection: &'static str,
}

#[derive(Default)]
pub struct FeedHub {
    // Multiple connections per user are allowed (several open tabs).
    sessions: HashMap<String, Vec<Recipient<FeedPush>>>,
}

impl FeedHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn send_to_user(&self, user_id: &str, payload: &str) {
        if let Some(addrs) = self.sessions.get(user_id) {
            for addr in addrs {
                addr.do_send(FeedPush {
                    payload: payload.to_string(),
                });
            }
        }
    }

    fn send_to_all(&self, payload: &str) {
        for addrs in self.sessions.values() {
            for addr in addrs {
                addr.do_send(FeedPush {
                    payload: payload.to_string(),
                });
            }
        }
    }
}

impl Actor for FeedHub {
    type Context = Context<Self>;
}

impl Handler<Connect> for FeedHub {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        info!("user {} subscribed to the feed", msg.user_id);
        self.sessions
            .entry(msg.user_id)
            .or_default()
            .push(msg.addr);
    }
}

impl Handler<Disconnect> for FeedHub {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        info!("user {} left the feed", msg.user_id);
        if let Some(addrs) = self.sessions.get_mut(&msg.user_id) {
            addrs.retain(|a| a != &msg.addr);
            if addrs.is_empty() {
                self.sessions.remove(&msg.user_id);
            }
        }
    }
}

impl Handler<FeedEvent> for FeedHub {
    type Result = ();

    fn handle(&mut self, msg: FeedEvent, _: &mut Context<Self>) {
        match msg.user_id {
            Some(user_id) => self.send_to_user(&user_id, &msg.payload),
            None => self.send_to_all(&msg.payload),
        }
    }
}

impl Handler<Revalidate> for FeedHub {
    type Result = ();

    fn handle(&mut self, msg: Revalidate, _: &mut Context<Self>) {
        let payload = json!({ "event": "revalidate", "collection": msg.collection }).to_string();
        self.send_to_all(&payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Collector {
        received: Arc<Mutex<Vec<String>>>,
    }

    impl Actor for Collector {
        type Context = Context<Self>;
    }

    impl Handler<FeedPush> for Collector {
        type Result = ();

        fn handle(&mut self, msg: FeedPush, _: &mut Context<Self>) {
            self.received.lock().unwrap().push(msg.payload);
        }
    }

    /// No-op message awaited to drain the collector's mailbox, so earlier
    /// `do_send`s are guaranteed to have been handled.
    #[derive(Message)]
    #[rtype(result = "()")]
    struct Drain;

    impl Handler<Drain> for Collector {
        type Result = ();

        fn handle(&mut self, _: Drain, _: &mut Context<Self>) {}
    }

    #[actix_web::test]
    async fn disconnect_unsubscribes_the_session_address() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let collector = Collector {
            received: received.clone(),
        }
        .start();
        let addr: Recipient<FeedPush> = collector.clone().recipient();
        let hub = FeedHub::new().start();

        hub.send(Connect {
            user_id: "alice".to_string(),
            addr: addr.clone(),
        })
        .await
        .unwrap();
        hub.send(FeedEvent {
            user_id: Some("alice".to_string()),
            payload: "first".to_string(),
        })
        .await
        .unwrap();
        collector.send(Drain).await.unwrap();
        assert_eq!(received.lock().unwrap().as_slice(), ["first".to_string()]);

        // Disconnect carries the session address so only that session is
        // dropped; afterwards events for the user no longer reach it.
        hub.send(Disconnect {
            user_id: "alice".to_string(),
            addr,
        })
        .await
        .unwrap();
        hub.send(FeedEvent {
            user_id: Some("alice".to_string()),
            payload: "second".to_string(),
        })
        .await
        .unwrap();
        collector.send(Drain).await.unwrap();
        assert_eq!(received.lock().unwrap().len(), 1);
    }
}
