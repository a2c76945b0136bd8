// Rocket routes for the Battlesnake webhook API
//
// Each route pulls the shared Bot out of managed state and hands it the
// decoded request. Malformed request bodies are answered by the catchers at
// the bottom of this file.

use log::{debug, warn};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::{json, Value};

use astar_battlesnake::bot::Bot;
use astar_battlesnake::types::GameState;

#[get("/")]
pub fn index(bot: &rocket::State<Bot>) -> Json<Value> {
    Json(bot.info())
}

#[post("/start", format = "json", data = "<req>")]
pub fn start(bot: &rocket::State<Bot>, req: Json<GameState>) -> Status {
    bot.start(&req.game, &req.turn, &req.board, &req.you);
    Status::Ok
}

/// Answers with `{"move": "<direction>"}` within the configured budget
#[post("/move", format = "json", data = "<req>")]
pub async fn get_move(bot: &rocket::State<Bot>, req: Json<GameState>) -> Json<Value> {
    debug!(
        "Move request: game {}, turn {}, {} snakes on {}x{}",
        req.game.id,
        req.turn,
        req.board.snakes.len(),
        req.board.width,
        req.board.height
    );

    Json(bot.get_move(&req.game, &req.turn, &req.board, &req.you).await)
}

#[post("/end", format = "json", data = "<req>")]
pub fn end(bot: &rocket::State<Bot>, req: Json<GameState>) -> Status {
    bot.end(&req.game, &req.turn, &req.board, &req.you);
    Status::Ok
}

/// Bodies that fail to deserialize into a GameState
#[catch(422)]
pub fn unprocessable(req: &Request) -> Json<Value> {
    warn!("Rejected malformed request body on {}", req.uri());
    Json(json!({ "error": "request body is not a valid game state" }))
}

#[catch(400)]
pub fn bad_request(req: &Request) -> Json<Value> {
    warn!("Bad request on {}", req.uri());
    Json(json!({ "error": "bad request" }))
}
