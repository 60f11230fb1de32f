//! Robot lifecycle, configuration and collaborators
//! Run with: cargo test --test lifecycle_test

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{build_robot, eventually, ready_robot, text, RecordingAdapter, RunBehavior};
use mmbot::domain::traits::{Router, StoredValue};
use mmbot::infrastructure::logging::LogFeed;
use mmbot::infrastructure::router::NullRouter;
use mmbot::infrastructure::storage::MemoryBrain;
use mmbot::{events, Brain, BotError, BrainExt, Config, ConfigError, Json, Robot, RobotState, StorageError};
use tracing_subscriber::prelude::*;

fn record_events(robot: &Robot, log: &Arc<Mutex<Vec<String>>>) {
    {
        let log = Arc::clone(log);
        robot.on(events::SCRIPTS_LOADED, move |names: &Vec<String>| {
            log.lock().unwrap().push(format!("{}:{}", events::SCRIPTS_LOADED, names.len()));
        });
    }
    {
        let log = Arc::clone(log);
        robot.on(events::ADAPTER_RUNNING, move |id: &String| {
            log.lock().unwrap().push(format!("{}:{}", events::ADAPTER_RUNNING, id));
        });
    }
    for key in [
        events::ROBOT_READY,
        events::SHUTTING_DOWN,
        events::SHUTDOWN_COMPLETE,
        events::RESETTING,
    ] {
        let log = Arc::clone(log);
        robot.on(key, move |_: &bool| log.lock().unwrap().push(key.to_string()));
    }
}

#[tokio::test]
async fn test_unconfigured_robot_cannot_run() {
    let robot = Robot::new("mmbot");
    assert!(matches!(robot.run().await, Err(BotError::NotConfigured)));
    assert!(matches!(robot.get_config_variable("X"), Err(BotError::NotConfigured)));
    assert_eq!(robot.state(), RobotState::Unconfigured);
}

#[tokio::test]
async fn test_run_starts_adapters_and_tolerates_failures() {
    let good = Arc::new(RecordingAdapter::new("good"));
    let unconfigured = Arc::new(RecordingAdapter::new("lazy").with_run_behavior(RunBehavior::NotConfigured));
    let broken = Arc::new(RecordingAdapter::new("broken").with_run_behavior(RunBehavior::Fail));
    let robot = build_robot(Config::default(), &[unconfigured.clone(), broken.clone(), good.clone()]).await;
    assert_eq!(robot.state(), RobotState::Configured);

    let log = Arc::new(Mutex::new(Vec::new()));
    record_events(&robot, &log);

    robot.run().await.unwrap();

    assert!(robot.is_ready());
    assert_eq!(robot.state(), RobotState::Ready);
    assert_eq!((unconfigured.runs(), broken.runs(), good.runs()), (1, 1, 1));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["ScriptsLoaded:0", "AdapterRunning:good", "RobotReady"]
    );
}

#[tokio::test]
async fn test_shutdown_releases_everything_and_can_repeat() {
    let (robot, adapter) = ready_robot().await;
    let log = Arc::new(Mutex::new(Vec::new()));
    record_events(&robot, &log);

    let cleanups = Arc::new(AtomicUsize::new(0));
    {
        let cleanups = Arc::clone(&cleanups);
        robot.register_cleanup(move || {
            cleanups.fetch_add(1, Ordering::SeqCst);
        });
    }
    robot.hear(".*", |_| async { Ok(()) }).unwrap();

    robot.shutdown().await.unwrap();
    assert!(!robot.is_ready());
    assert_eq!(robot.state(), RobotState::Stopped);
    assert_eq!(robot.listener_count(), 0);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.closes(), 1);
    assert_eq!(*log.lock().unwrap(), vec!["ShuttingDown", "ShutdownComplete"]);

    robot.shutdown().await.unwrap();
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.closes(), 2);
}

#[tokio::test]
async fn test_robot_restarts_after_shutdown() {
    let (robot, adapter) = ready_robot().await;
    robot.shutdown().await.unwrap();

    robot.run().await.unwrap();
    robot
        .hear("again", |res| async move {
            res.finish();
            Ok(())
        })
        .unwrap();
    assert!(robot.receive(text(&adapter, "alice", "again")).await);
    assert_eq!(adapter.runs(), 2);
}

#[tokio::test]
async fn test_reset_shuts_down_and_notifies_host() {
    let (robot, adapter) = ready_robot().await;
    let log = Arc::new(Mutex::new(Vec::new()));
    record_events(&robot, &log);
    let reset = robot.reset_requested();

    robot.reset().await;

    assert!(tokio::time::timeout(Duration::from_secs(1), reset.notified()).await.is_ok());
    assert_eq!(adapter.closes(), 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["Resetting", "ShuttingDown", "ShutdownComplete"]
    );
}

struct BrokenBrain;

#[async_trait]
impl Brain for BrokenBrain {
    async fn initialize(&self, _robot: &Robot) -> Result<(), BotError> {
        Err(BotError::Internal("connection refused".into()))
    }

    async fn get_raw(&self, _key: &str) -> Result<Option<StoredValue>, StorageError> {
        Err(StorageError::Closed)
    }

    async fn set_raw(&self, _key: &str, _value: StoredValue) -> Result<(), StorageError> {
        Err(StorageError::Closed)
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Closed)
    }

    async fn close(&self) -> Result<(), StorageError> {
        Err(StorageError::Closed)
    }
}

#[tokio::test]
async fn test_brain_failure_at_build_is_fatal() {
    let result = Robot::builder().brain(Arc::new(BrokenBrain)).build().await;
    assert!(matches!(result, Err(BotError::BrainUnavailable(_))));
}

#[tokio::test]
async fn test_brain_round_trips_through_robot() {
    let robot = Robot::builder()
        .brain(Arc::new(MemoryBrain::new()))
        .build()
        .await
        .unwrap();
    let brain = robot.brain().unwrap();

    assert!(brain.get::<String>("missing").await.unwrap().is_none());

    brain.set("motd", &"be kind".to_string()).await.unwrap();
    brain.set("seen", &Json(vec![1u32, 2, 3])).await.unwrap();
    assert_eq!(brain.get::<String>("motd").await.unwrap().as_deref(), Some("be kind"));
    assert_eq!(
        brain.get::<Json<Vec<u32>>>("seen").await.unwrap().map(Json::into_inner),
        Some(vec![1, 2, 3])
    );

    brain.remove("motd").await.unwrap();
    assert!(brain.get::<String>("motd").await.unwrap().is_none());
}

#[tokio::test]
async fn test_user_roles_live_in_the_brain() {
    let robot = Robot::builder()
        .brain(Arc::new(MemoryBrain::new()))
        .build()
        .await
        .unwrap();

    robot.add_user_to_roles("Alice", &["ops", "dev,ops"]).await.unwrap();
    robot.add_user_to_role("alice", "ops").await.unwrap();
    assert_eq!(robot.get_user_roles("ALICE").await.unwrap(), vec!["ops", "devops"]);

    let user = robot.get_user("42", "alice", "general", "test").await.unwrap();
    assert!(user.is_in_role("OPS"));

    robot.remove_user_from_role("alice", "OPS").await.unwrap();
    assert!(!robot.is_in_role("alice", "ops").await.unwrap());
    assert!(robot.is_in_role("alice", "devops").await.unwrap());
}

#[tokio::test]
async fn test_config_variables_and_admins() {
    let mut config = Config::default();
    config.variables.insert("MMBOT_AUTH_ADMIN".into(), "alice, bob".into());
    config.variables.insert("GREETING".into(), "hi".into());
    let robot = build_robot(config, &[]).await;

    assert_eq!(robot.get_config_variable("GREETING").unwrap().as_deref(), Some("hi"));
    assert_eq!(
        robot.get_config_variable("PATH").unwrap(),
        std::env::var("PATH").ok()
    );
    assert_eq!(robot.admins().unwrap(), vec!["alice", "bob", "ConsoleUser"]);
    assert!(robot.is_admin("BOB"));
    assert!(robot.is_admin("ConsoleUser"));
    assert!(!robot.is_admin("mallory"));
}

#[tokio::test]
async fn test_router_port_comes_from_config() {
    let mut config = Config::default();
    config.variables.insert("MMBOT_ROUTER_PORT".into(), "8080".into());
    let router = Arc::new(NullRouter::new());
    Robot::builder()
        .config(config)
        .router(router.clone())
        .build()
        .await
        .unwrap();
    assert_eq!(router.port(), 8080);

    let mut config = Config::default();
    config.variables.insert("MMBOT_ROUTER_PORT".into(), "eighty".into());
    let result = Robot::builder().config(config).build().await;
    assert!(matches!(result, Err(BotError::Config(ConfigError::InvalidValue(_)))));
}

struct RefusingRouter {
    stops: AtomicUsize,
}

impl Router for RefusingRouter {
    fn configure(&self, _port: u16) {}

    fn start(&self) -> Result<(), BotError> {
        Err(BotError::Router("address in use".into()))
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_router_start_failure_does_not_block_run() {
    let router = Arc::new(RefusingRouter { stops: AtomicUsize::new(0) });
    let adapter = Arc::new(RecordingAdapter::new("test"));
    let robot = Robot::builder()
        .router(router.clone())
        .adapter(adapter.clone())
        .build()
        .await
        .unwrap();

    robot.run().await.unwrap();
    assert!(robot.is_ready());
    assert_eq!(adapter.runs(), 1);

    robot.shutdown().await.unwrap();
    assert_eq!(router.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_log_rooms_receive_mirrored_warnings() {
    let feed = LogFeed::new(tracing::Level::WARN);
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(feed.layer()));

    let adapter = Arc::new(RecordingAdapter::new("ops").with_log_rooms(&["logs"]));
    let robot = Robot::builder()
        .adapter(adapter.clone())
        .log_feed(feed.clone())
        .build()
        .await
        .unwrap();
    robot.run().await.unwrap();
    assert!(feed.is_enabled());

    tracing::warn!("disk almost full");
    assert!(
        eventually(|| adapter
            .sent()
            .iter()
            .any(|s| s.room == "logs" && s.lines.iter().any(|l| l.contains("disk almost full"))))
        .await
    );

    robot.shutdown().await.unwrap();
    assert!(!feed.is_enabled());
}

#[tokio::test]
async fn test_warnings_from_log_room_sends_are_not_mirrored() {
    let feed = LogFeed::new(tracing::Level::WARN);
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(feed.layer()));

    let adapter = Arc::new(
        RecordingAdapter::new("noisy")
            .with_log_rooms(&["logs"])
            .warning_on_send(),
    );
    let robot = Robot::builder()
        .adapter(adapter.clone())
        .log_feed(feed.clone())
        .build()
        .await
        .unwrap();
    robot.run().await.unwrap();

    tracing::warn!("disk almost full");
    assert!(eventually(|| adapter.sent().len() == 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(adapter.lines().len(), 1);
    assert!(adapter.lines()[0].contains("disk almost full"));

    robot.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_log_rooms_stay_off_without_rooms() {
    let feed = LogFeed::new(tracing::Level::WARN);
    let robot = Robot::builder()
        .adapter(Arc::new(RecordingAdapter::new("quiet")))
        .log_feed(feed.clone())
        .build()
        .await
        .unwrap();
    robot.run().await.unwrap();
    assert!(!feed.is_enabled());
}
