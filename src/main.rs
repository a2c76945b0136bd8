#[macro_use]
extern crate rocket;

use log::info;
use rocket::fairing::AdHoc;
use std::env;

use astar_battlesnake::bot::Bot;
use astar_battlesnake::config::Config;
use astar_battlesnake::debug_logger::DebugLogger;

mod handler;

#[launch]
async fn rocket() -> _ {
    // Hosting platforms hand out `PORT`; Rocket only reads `ROCKET_PORT`
    if let Ok(port) = env::var("PORT") {
        env::set_var("ROCKET_PORT", &port);
    }

    // `RUST_LOG` wins when set, otherwise info
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }

    env_logger::init();

    let config = Config::load_or_default();
    info!(
        "Starting A* Battlesnake (max {} expansions, {}ms budget, threat prediction {})",
        config.search.max_expansions,
        config.timing.effective_budget_ms(),
        if config.threat.enabled { "on" } else { "off" }
    );

    let debug_logger = DebugLogger::new(config.debug.enabled, &config.debug.log_file_path).await;
    let bot = Bot::new(config).with_debug_logger(debug_logger);

    rocket::build()
        .manage(bot)
        .attach(AdHoc::on_response("Server header", |_, res| {
            Box::pin(async move {
                res.set_raw_header("Server", "battlesnake/github/astar-battlesnake");
            })
        }))
        .mount(
            "/",
            routes![handler::index, handler::start, handler::get_move, handler::end],
        )
        .register("/", catchers![handler::unprocessable, handler::bad_request])
}
