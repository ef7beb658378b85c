//local shortcuts

//third-party shortcuts

//standard shortcuts
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Make a websocket url for this crate's `/ws` route: `{ws,wss}://ip:port/ws`.
pub fn make_websocket_url(with_tls: bool, address: SocketAddr) -> Result<url::Url, ()>
{
    let mut url = url::Url::parse("https://example.net").map_err(|_| ())?;
    let scheme = if with_tls { "wss" } else { "ws" };
    url.set_scheme(scheme)?;
    url.set_ip_host(address.ip())?;
    url.set_port(Some(address.port()))?;
    url.set_path("/ws");
    Ok(url)
}

//-------------------------------------------------------------------------------------------------------------------

/// Config for the fan-out server (component F/G inputs), covering every option named in the
/// wire-level process interface.
#[derive(Debug, Clone)]
pub struct ServerConfig
{
    /// Address the accept loop binds to. Defaults to `127.0.0.1:0` (ephemeral port).
    pub listen_addr: SocketAddr,
    /// Max number of concurrently Active sessions. Defaults to 1000.
    pub max_connections: u32,
    /// Max filters a single session may hold at once. Defaults to 64.
    pub max_filters_per_session: u32,
    /// Interval between heartbeat pings on an otherwise idle session. Defaults to 30s.
    pub ping_interval: Duration,
    /// Duration since `lastActivityAt` after which a session is closed with `HEARTBEAT_TIMEOUT`. Defaults to 90s.
    pub idle_timeout: Duration,
    /// Duration the oldest pending outbound frame may sit before `WRITE_STALL` closes the session. Defaults to 15s.
    pub write_stall_timeout: Duration,
    /// Bounded send-queue depth (frames) before submits are tail-dropped. Defaults to 1024.
    pub send_queue_high_water: usize,
    /// Max inbound frame size in bytes. Defaults to 1 MiB.
    pub max_frame_bytes: usize,
    /// Grace period for queue drain on shutdown before sockets are aborted. Defaults to 30s.
    pub drain_timeout: Duration,
    /// Max malformed/unknown frames tolerated per minute before the session closes. Defaults to 10.
    pub protocol_error_budget: u32,
}

impl Default for ServerConfig
{
    fn default() -> ServerConfig
    {
        ServerConfig{
                listen_addr            : "127.0.0.1:0".parse().unwrap(),
                max_connections        : 1_000,
                max_filters_per_session: 64,
                ping_interval          : Duration::from_secs(30),
                idle_timeout           : Duration::from_secs(90),
                write_stall_timeout    : Duration::from_secs(15),
                send_queue_high_water  : 1024,
                max_frame_bytes        : 1_000_000,
                drain_timeout          : Duration::from_secs(30),
                protocol_error_budget  : 10,
            }
    }
}

impl ServerConfig
{
    /// Build a config from environment variables, falling back to [`ServerConfig::default()`]
    /// for anything unset or unparsable. Mirrors the gateway's small `parse_*` helper pattern.
    pub fn from_env() -> ServerConfig
    {
        let defaults = ServerConfig::default();

        ServerConfig{
                listen_addr            : parse_socket("MARKETFLOW_LISTEN_ADDR", defaults.listen_addr),
                max_connections        : parse_u32("MARKETFLOW_MAX_CONNECTIONS", defaults.max_connections),
                max_filters_per_session: parse_u32("MARKETFLOW_MAX_FILTERS_PER_SESSION", defaults.max_filters_per_session),
                ping_interval          : parse_duration_secs("MARKETFLOW_PING_INTERVAL_SECS", defaults.ping_interval),
                idle_timeout           : parse_duration_secs("MARKETFLOW_IDLE_TIMEOUT_SECS", defaults.idle_timeout),
                write_stall_timeout    : parse_duration_secs("MARKETFLOW_WRITE_STALL_TIMEOUT_SECS", defaults.write_stall_timeout),
                send_queue_high_water  : parse_usize("MARKETFLOW_SEND_QUEUE_HIGH_WATER", defaults.send_queue_high_water),
                max_frame_bytes        : parse_usize("MARKETFLOW_MAX_FRAME_BYTES", defaults.max_frame_bytes),
                drain_timeout          : parse_duration_secs("MARKETFLOW_DRAIN_TIMEOUT_SECS", defaults.drain_timeout),
                protocol_error_budget  : parse_u32("MARKETFLOW_PROTOCOL_ERROR_BUDGET", defaults.protocol_error_budget),
            }
    }
}

//-------------------------------------------------------------------------------------------------------------------

fn parse_socket(key: &str, default: SocketAddr) -> SocketAddr
{
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_duration_secs(key: &str, default: Duration) -> Duration
{
    match env::var(key)
    {
        Ok(v) => v.parse::<u64>().map(Duration::from_secs).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_u32(key: &str, default: u32) -> u32
{
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize
{
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

//-------------------------------------------------------------------------------------------------------------------

/// Logging filter helper for the demo binary, mirroring the gateway's `tracing_filter()`:
/// `MARKETFLOW_LOG`/`RUST_LOG` take precedence, otherwise default to `info`.
pub fn tracing_filter_from_env() -> String
{
    env::var("MARKETFLOW_LOG").or_else(|_| env::var("RUST_LOG")).unwrap_or_else(|_| "info".to_string())
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_match_spec()
    {
        let c = ServerConfig::default();
        assert_eq!(c.max_connections, 1000);
        assert_eq!(c.max_filters_per_session, 64);
        assert_eq!(c.ping_interval, Duration::from_secs(30));
        assert_eq!(c.idle_timeout, Duration::from_secs(90));
        assert_eq!(c.write_stall_timeout, Duration::from_secs(15));
        assert_eq!(c.send_queue_high_water, 1024);
        assert_eq!(c.max_frame_bytes, 1_000_000);
        assert_eq!(c.drain_timeout, Duration::from_secs(30));
        assert_eq!(c.protocol_error_budget, 10);
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset()
    {
        // SAFETY: test-only, single-threaded access to this specific var.
        unsafe { env::remove_var("MARKETFLOW_MAX_CONNECTIONS"); }
        let c = ServerConfig::from_env();
        assert_eq!(c.max_connections, ServerConfig::default().max_connections);
    }

    #[test]
    fn websocket_url_uses_ws_scheme_and_ws_path()
    {
        let url = make_websocket_url(false, "127.0.0.1:8080".parse().unwrap()).unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), "/ws");
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn websocket_url_uses_wss_scheme_when_tls()
    {
        let url = make_websocket_url(true, "127.0.0.1:8080".parse().unwrap()).unwrap();
        assert_eq!(url.scheme(), "wss");
    }
}

//-------------------------------------------------------------------------------------------------------------------
