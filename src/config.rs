//! 환경 변수 기반 설정 관리

use std::env;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub log_level: String,
}

/// 인증 연동 설정
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// 상위 인증 계층이 사용자 식별자를 실어 보내는 헤더
    pub user_header: String,
}

/// 큐 영속화 DB 설정
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 없으면 메모리 사본만 사용
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["*".to_string()],
            auth: AuthConfig {
                user_header: "x-forwarded-user".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            auth: AuthConfig {
                user_header: env::var("AUTH_USER_HEADER")
                    .map(|v| v.trim().to_ascii_lowercase())
                    .unwrap_or(defaults.auth.user_header),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.database.max_connections),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// 모든 origin 허용 여부
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}
