use std::net::Ipv4Addr;

const RELAY_PORT: &str = "RELAY_PORT";

const DEFAULT_PORT: u16 = 8080;

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(RELAY_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const RELAY_ADDR: &str = "RELAY_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(RELAY_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

const RELAY_TOKEN: &str = "RELAY_TOKEN";

pub fn get_token() -> Option<String> {
    let token_from_env = std::env::var(RELAY_TOKEN);
    token_from_env.ok().filter(|token| !token.is_empty())
}
