use lib::auth::TokenHandler;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: {} <jwt secret> <token>", args[0]);
        std::process::exit(2);
    }
    let jwt_secret = &args[1];
    let token = &args[2];

    let token_handler = TokenHandler::new(jwt_secret.clone());

    match token_handler.verify_token(token) {
        Ok(claims) => println!("{}", serde_json::to_string_pretty(&claims).unwrap()),
        Err(e) => {
            eprintln!("invalid token: {}", e);
            std::process::exit(1);
        }
    }
}
