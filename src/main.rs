//! # Scrivo CLI 진입점
//!
//! 블로그 API를 터미널에서 사용하는 명령줄 도구입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 설정 로딩 후 저장된 세션 복원
//! 4. 서브커맨드 실행 (로그인, 게시글 조회/작성, 좋아요 등)
//!
//! 세션은 `SESSION_DIR`에 저장되므로 명령을 여러 번 실행해도 로그인 상태가 유지됩니다.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrivo::{
    api::{articles, auth, profile},
    models::{Article, ArticlePatch, ArticleQuery, LoginRequest, NewArticle, RegisterRequest, SortOrder},
    notify::{LogNotifier, Notice, Notifier},
    Config, LikeController, LikeOutcome, LikeState, SessionClient,
};

/// 블로그 API 명령줄 클라이언트
#[derive(Parser, Debug)]
#[command(name = "scrivo", about = "Command line client for the blogging API")]
struct Cli {
    /// 세션 저장 디렉토리 (기본값: SESSION_DIR 또는 data/session)
    #[arg(long, global = true)]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 회원가입 (이메일로 OTP가 발송됩니다)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// 회원가입 OTP 인증
    #[command(name = "verify-otp")]
    VerifyOtp { code: String },

    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    Logout,

    /// 현재 로그인 사용자 표시
    Whoami,

    /// 전체 게시글 목록
    Articles,

    /// 내 게시글 목록 (검색/카테고리/페이지)
    #[command(name = "my-articles")]
    MyArticles {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long, value_enum)]
        order: Option<Order>,
    },

    /// 게시글 작성
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// 본문 파일 경로
        #[arg(long = "content-file", short = 'f')]
        content_file: PathBuf,
        #[arg(long)]
        category: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        image_url: Option<String>,
    },

    /// 게시글 수정 (지정한 필드만 바뀝니다)
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "content-file")]
        content_file: Option<PathBuf>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },

    Delete { id: String },

    Like { id: String },

    Unlike { id: String },

    #[command(name = "change-password")]
    ChangePassword {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },

    /// 프로필 사진 변경 (data URL이 담긴 텍스트 파일)
    #[command(name = "upload-avatar")]
    UploadAvatar { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Order {
    Asc,
    Desc,
}

impl From<Order> for SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => SortOrder::Asc,
            Order::Desc => SortOrder::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅 초기화 ──
    // 로그는 stderr로 보내서 stdout 출력(게시글 목록 등)과 섞이지 않게 합니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrivo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // ── 3단계: 설정 로딩, 세션 복원 ──
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.session_dir {
        config = config.with_session_dir(dir);
    }
    tracing::debug!(base_url = %config.base_url, "using API");
    let session = SessionClient::from_config(&config).await?;

    // ── 4단계: 명령 실행 ──
    match cli.command {
        Commands::Register { name, email, password } => {
            let req = RegisterRequest {
                name,
                email,
                confirm_password: password.clone(),
                password,
            };
            announce(auth::register(&session, &req).await?);
        }
        Commands::VerifyOtp { code } => {
            announce(auth::verify_otp(&session, &code).await?);
        }
        Commands::Login { email, password } => {
            announce(auth::login(&session, &LoginRequest { email, password }).await?);
        }
        Commands::Logout => {
            announce(auth::logout(&session).await?);
        }
        Commands::Whoami => match session.view().user {
            Some(user) => println!("{} <{}> ({})", user.name, user.email, user.id),
            None => println!("Not logged in."),
        },
        Commands::Articles => {
            let list = articles::list_all(&session).await?;
            print_articles(&list, session.view().user_id());
        }
        Commands::MyArticles {
            search,
            category,
            page,
            limit,
            sort_by,
            order,
        } => {
            let query = ArticleQuery {
                search,
                category,
                page,
                limit,
                sort_by,
                order: order.map(SortOrder::from),
            };
            let list = articles::list_mine(&session, &query).await?;
            print_articles(&list, session.view().user_id());
        }
        Commands::Create {
            title,
            description,
            content_file,
            category,
            tags,
            image_url,
        } => {
            let content = read_text(&content_file).await?;
            let article = NewArticle {
                title,
                description,
                content,
                category,
                image_url,
                image_base64: None,
                tags,
            };
            announce(articles::create(&session, &article).await?);
        }
        Commands::Edit {
            id,
            title,
            description,
            content_file,
            category,
            tags,
        } => {
            let content = match content_file {
                Some(path) => Some(read_text(&path).await?),
                None => None,
            };
            let patch = ArticlePatch {
                title,
                description,
                content,
                category,
                tags,
                ..ArticlePatch::default()
            };
            announce(articles::edit(&session, &id, patch).await?);
        }
        Commands::Delete { id } => {
            announce(articles::delete(&session, &id).await?);
        }
        Commands::Like { id } => toggle(&session, &id, true).await?,
        Commands::Unlike { id } => toggle(&session, &id, false).await?,
        Commands::ChangePassword { old, new } => {
            announce(profile::change_password(&session, &old, &new).await?);
        }
        Commands::UploadAvatar { file } => {
            let image = read_text(&file).await?;
            let url = profile::upload_profile_picture(&session, image.trim()).await?;
            announce(format!("Profile picture updated: {}", url));
        }
    }

    Ok(())
}

/// 서버가 돌려준 성공 메시지를 알림으로 남깁니다 (stderr 로그).
fn announce(message: impl Into<String>) {
    LogNotifier.notify(Notice::success(message));
}

/// 좋아요 상태를 `want_liked`로 맞춥니다. 이미 그 상태면 요청하지 않습니다.
async fn toggle(session: &SessionClient, id: &str, want_liked: bool) -> Result<()> {
    let controller = LikeController::new(session.clone(), Arc::new(LogNotifier));

    let list = articles::list_all(session).await?;
    let article = list
        .iter()
        .find(|a| a.id == id)
        .with_context(|| format!("article {} not found", id))?;
    let rx = controller.track(article);

    let current = *rx.borrow();
    if current.liked == want_liked {
        println!("Already {}.", if want_liked { "liked" } else { "not liked" });
        return Ok(());
    }

    match controller.toggle(id).await? {
        LikeOutcome::Confirmed(LikeState { liked, count }) => {
            println!("{} ({} likes)", if liked { "Liked" } else { "Unliked" }, count);
        }
        LikeOutcome::Ignored(_) => println!("A like request is already in progress."),
    }
    Ok(())
}

fn print_articles(list: &[Article], viewer: Option<&str>) {
    if list.is_empty() {
        println!("No articles.");
        return;
    }
    for article in list {
        let state = LikeState::from_article(article, viewer);
        println!(
            "{}  {}  [{}] by {}  {}{}",
            article.id,
            article.title,
            article.category,
            article.author.display_name(),
            if state.liked { "♥" } else { "♡" },
            state.count
        );
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}
