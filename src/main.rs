use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use futures_util::{SinkExt, StreamExt};
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message;
use xiast_chess::game::BoxedPolicy;
use xiast_chess::{Board, Color, Engine, Game, PieceKind, RandomPolicy, Square};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyKind {
    Random,
    Material,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Chess engine session server", long_about = None)]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 9999)]
    port: u16,
    /// How the computer side picks its moves.
    #[arg(long, value_enum, default_value_t = PolicyKind::Random)]
    policy: PolicyKind,
    /// Seed for the random policy; every session replays the same choices.
    #[arg(long)]
    seed: Option<u64>,
    /// Search depth of the material policy.
    #[arg(long, default_value_t = 2)]
    depth: u32,
    /// Time budget per move of the material policy.
    #[arg(long, default_value_t = 1000)]
    think_ms: u64,
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn make_policy(&self) -> BoxedPolicy {
        match self.policy {
            PolicyKind::Random => match self.seed {
                Some(seed) => Box::new(RandomPolicy::seeded(seed)),
                None => Box::new(RandomPolicy::from_entropy()),
            },
            PolicyKind::Material => Box::new(
                Engine::new(self.depth).with_time_limit(Duration::from_millis(self.think_ms)),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    let level: log::Level = args.log_level.parse()
        .map_err(|_| Error::new(ErrorKind::InvalidInput, format!("Invalid log level: {}", args.log_level)))?;
    simple_logger::init_with_level(level).map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;

    let address = format!("{}:{}", args.host, args.port);

    // Bind the server to a local port
    let listener = TcpListener::bind(address.clone()).await?;
    info!("Listening on: {} ({:?} policy)", address, args.policy);

    let args = Arc::new(args);
    while let Ok((stream, _)) = listener.accept().await {
        let args = Arc::clone(&args);
        tokio::spawn(async move {
            if let Err(e) = accept_connection(stream, args).await {
                error!("Connection failed: {:?}", e);
            }
        });
    }

    Ok(())
}

struct Session {
    started: bool,
    game: Game,
}

impl Session {
    fn new(policy: BoxedPolicy) -> Self {
        Self {
            started: false,
            game: Game::new(Color::White, policy),
        }
    }
}

async fn accept_connection(stream: TcpStream, args: Arc<Args>) -> Result<(), Error> {
    let addr = stream.peer_addr()?;
    info!("Peer address: {}", addr);

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| Error::new(ErrorKind::ConnectionAborted, e))?;
    info!("New WebSocket connection: {}", addr);

    let (mut write, mut read) = ws_stream.split();

    // each connection plays its own game
    let session = Arc::new(Mutex::new(Session::new(args.make_policy())));

    while let Some(raw_message) = read.next().await {
        match raw_message {
            Ok(text_message) => {
                if !text_message.is_text() && !text_message.is_binary() { continue; }
                match serde_json::from_slice::<Value>(&text_message.into_data()) {
                    Ok(data) => {
                        info!("Received: {}", data);
                        let response = match handle_message(&session, &args, data) {
                            Ok(resp) => resp,
                            Err(e) => {
                                error!("Error handling message: {:?}", e);
                                json!({"error": e.to_string()})
                            }
                        };
                        let response_str = response.to_string();
                        write.send(Message::text(response_str.clone())).await
                            .map_err(|e| Error::new(ErrorKind::BrokenPipe, e))?;
                        info!("Sent: {}", response_str);
                    },
                    Err(e) => { error!("Error parsing JSON: {:?}", e); }
                }
            }
            Err(e) => { error!("Error reading websocket message: {:?}", e); }
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

#[derive(Deserialize)]
struct MoveRequest {
    from: Square,
    to: Square,
    #[serde(default)]
    promotion: Option<PieceKind>,
}

fn handle_message(session: &Arc<Mutex<Session>>, args: &Args, data: Value) -> Result<Value, Error> {
    let mut session = session.lock()
        .map_err(|_| Error::new(ErrorKind::Other, "Session lock poisoned"))?;

    let map = data.as_object()
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "Expected a dict"))?;

    // client message protocol: "start", "move", "destinations"
    // server message protocol: "board", "status", "legal_moves", "move", "destinations", "end", "error"
    if map.contains_key("start") {
        let human: Color = serde_json::from_value(data["start"].clone())?;
        let board = match data.get("fen").and_then(Value::as_str) {
            Some(fen) => Some(fen.parse::<Board>()?),
            None => None,
        };
        handle_start(&mut session, args, human, board)
    } else if map.contains_key("move") {
        if !session.started {
            return Err(Error::new(ErrorKind::InvalidInput, "Game has not started yet"));
        }
        let request: MoveRequest = serde_json::from_value(data["move"].clone())?;
        handle_move(&mut session, request)
    } else if map.contains_key("destinations") {
        if !session.started {
            return Err(Error::new(ErrorKind::InvalidInput, "Game has not started yet"));
        }
        let from: Square = serde_json::from_value(data["destinations"].clone())?;
        Ok(json!({ "from": from, "destinations": session.game.legal_destinations(from) }))
    } else {
        Err(Error::new(ErrorKind::InvalidInput, format!("Invalid message: {}", data)))
    }
}

fn handle_start(session: &mut Session, args: &Args, human: Color, board: Option<Board>) -> Result<Value, Error> {
    session.started = true;
    session.game = match board {
        Some(board) => Game::with_board(board, human, args.make_policy()),
        None => Game::new(human, args.make_policy()),
    };
    info!("Game started, human plays {}", human);
    if session.game.is_human_turn() {
        Ok(position_message(&session.game))
    } else {
        make_engine_move(&mut session.game)
    }
}

fn handle_move(session: &mut Session, request: MoveRequest) -> Result<Value, Error> {
    let game = &mut session.game;
    if !game.is_human_turn() {
        return Err(Error::new(ErrorKind::InvalidInput, "Not your turn"));
    }
    game.make_move(request.from, request.to, request.promotion)?;
    match check_game_over(game) {
        Some(game_over) => Ok(game_over),
        None => make_engine_move(game)
    }
}

fn make_engine_move(game: &mut Game) -> Result<Value, Error> {
    if let Some(game_over) = check_game_over(game) {
        return Ok(game_over);
    }
    let selected_move = game.play_ai_move()?;
    match check_game_over(game) {
        Some(mut game_over) => {
            game_over["move"] = json!(selected_move);
            Ok(game_over)
        }
        None => {
            let mut response = position_message(game);
            response["move"] = json!(selected_move);
            Ok(response)
        }
    }
}

fn position_message(game: &Game) -> Value {
    json!({
        "board": game.board().to_fen(),
        "status": game.status(),
        "legal_moves": game.legal_moves(),
    })
}

fn check_game_over(game: &Game) -> Option<Value> {
    let status = game.status();
    if status.is_over() {
        info!("Game over: {:?}", status);
        Some(json!({ "end": status, "board": game.board().to_fen() }))
    } else {
        None
    }
}
