// src/feed_socket.rs

use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::warn;

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::feed_hub::{Connect, Disconnect, FeedHub, FeedPush};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// One WebSocket session on the real-time feed. Read-only from the client's
/// side: the socket only carries server-pushed events.
pub struct FeedSocket {
    user_id: String,
    hb: Instant,
    hub: Addr<FeedHub>,
}

impl FeedSocket {
    pub fn new(user_id: String, hub: Addr<FeedHub>) -> Self {
        FeedSocket {
            user_id,
            hb: Instant::now(),
            hub,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!("feed client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for FeedSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
        self.hub.do_send(Connect {
            user_id: self.user_id.clone(),
            addr: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        self.hub.do_send(Disconnect {
            user_id: self.user_id.clone(),
            addr: ctx.address().recipient(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for FeedSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("feed socket error: {}", e);
                ctx.stop();
            }
            // The feed is one-way; client text frames are ignored.
            _ => {}
        }
    }
}

impl Handler<FeedPush> for FeedSocket {
    type Result = ();

    fn handle(&mut self, msg: FeedPush, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.text(msg.payload);
    }
}

/// GET /ws
pub async fn feed_index(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user_id = current_user(&req)?;
    ws::start(FeedSocket::new(user_id, data.feed.clone()), &req, stream)
}
