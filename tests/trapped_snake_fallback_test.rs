// Integration tests for the Bot's /move behaviour
//
// Exercises the full path from wire types to the JSON response:
// - planned moves toward food
// - boxed-in snakes still answer with an in-bounds move
// - random fallback never picks an illegal move when a legal one exists

use serde_json::json;
use astar_battlesnake::bot::Bot;
use astar_battlesnake::config::Config;
use astar_battlesnake::types::{Battlesnake, Board, Coord, Game};
use std::collections::HashMap;

fn game() -> Game {
    let mut ruleset = HashMap::new();
    ruleset.insert("name".to_string(), json!("standard"));
    Game {
        id: "test-game".to_string(),
        ruleset,
        timeout: 500,
    }
}

fn snake(id: &str, body: Vec<Coord>) -> Battlesnake {
    Battlesnake {
        id: id.to_string(),
        name: id.to_string(),
        health: 50,
        head: body[0],
        length: body.len() as i32,
        body,
        latency: "0".to_string(),
        shout: None,
    }
}

fn seeded_bot() -> Bot {
    let mut config = Config::default_hardcoded();
    config.fallback.rng_seed = Some(7);
    Bot::new(config)
}

/// Snake heads straight for food two cells above it
#[tokio::test]
async fn test_moves_toward_food() {
    let bot = seeded_bot();
    let you = snake("our-snake", vec![Coord::new(5, 5), Coord::new(5, 4), Coord::new(5, 3)]);
    let board = Board {
        height: 11,
        width: 11,
        food: vec![Coord::new(5, 7)],
        snakes: vec![you.clone()],
        hazards: vec![],
    };

    let response = bot.get_move(&game(), &3, &board, &you).await;
    assert_eq!(response["move"], "up");
}

/// Snake at top wall (y=10), completely surrounded: should not answer "up"
#[tokio::test]
async fn test_trapped_at_top_wall_chooses_in_bounds_move() {
    let bot = seeded_bot();

    // Body blocks down and left, opponent blocks right
    let you = snake(
        "our-snake",
        vec![
            Coord::new(5, 10),
            Coord::new(5, 9),
            Coord::new(4, 9),
            Coord::new(4, 10),
        ],
    );
    let opponent = snake("opponent", vec![Coord::new(6, 10), Coord::new(6, 9), Coord::new(6, 8)]);
    let board = Board {
        height: 11,
        width: 11,
        food: vec![Coord::new(0, 0)],
        snakes: vec![you.clone(), opponent],
        hazards: vec![],
    };

    let response = bot.get_move(&game(), &0, &board, &you).await;
    let chosen_move = response["move"].as_str().unwrap();

    assert_ne!(chosen_move, "up", "Bot should not choose 'up' when at top wall (y=10)");
}

/// Snake at bottom-left corner boxed in by its own body: should not answer "down" or "left"
#[tokio::test]
async fn test_trapped_in_corner_stays_in_bounds() {
    let bot = seeded_bot();
    let you = snake(
        "our-snake",
        vec![Coord::new(0, 0), Coord::new(1, 0), Coord::new(1, 1), Coord::new(0, 1)],
    );
    let board = Board {
        height: 11,
        width: 11,
        food: vec![],
        snakes: vec![you.clone()],
        hazards: vec![],
    };

    let response = bot.get_move(&game(), &12, &board, &you).await;
    let chosen_move = response["move"].as_str().unwrap();

    assert!(chosen_move == "up" || chosen_move == "right", "got {}", chosen_move);
}

/// With no food the bot wanders, but only onto free cells
#[tokio::test]
async fn test_no_food_random_move_is_legal() {
    let bot = seeded_bot();
    let you = snake("our-snake", vec![Coord::new(0, 5), Coord::new(1, 5), Coord::new(1, 4)]);
    let board = Board {
        height: 11,
        width: 11,
        food: vec![],
        snakes: vec![you.clone()],
        hazards: vec![],
    };

    for turn in 0..20 {
        let response = bot.get_move(&game(), &turn, &board, &you).await;
        let chosen_move = response["move"].as_str().unwrap();
        assert!(
            chosen_move == "up" || chosen_move == "down",
            "turn {}: illegal move {}",
            turn,
            chosen_move
        );
    }
}

/// A snake missing from board.snakes is still planned for
#[tokio::test]
async fn test_you_missing_from_board_snakes() {
    let bot = seeded_bot();
    let you = snake("our-snake", vec![Coord::new(2, 2)]);
    let board = Board {
        height: 5,
        width: 5,
        food: vec![Coord::new(4, 2)],
        snakes: vec![],
        hazards: vec![],
    };

    let response = bot.get_move(&game(), &1, &board, &you).await;
    assert_eq!(response["move"], "right");
}

#[test]
fn test_info_reports_api_version() {
    let bot = Bot::new(Config::default_hardcoded());
    assert_eq!(bot.info()["apiversion"], "1");
}
