use super::config::{PollingConfig, RefreshOnVisible, TickGate};
use super::market_hours::MarketGate;
use super::schedule::{PollingState, RefreshSchedule};
use crate::client::error::FetchError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Источник данных представления: как загрузить и куда положить результат
#[async_trait]
pub trait RefreshTask: Send + Sync + 'static {
    type Output: Send + 'static;

    fn name(&self) -> &str;

    /// Вызывается перед каждым запросом
    fn begin(&self) {}

    async fn fetch(&self) -> Result<Self::Output, FetchError>;

    /// После остановки контроллера не вызывается
    fn apply(&self, outcome: Result<Self::Output, FetchError>);

    /// Запрос, начатый `begin`, прерван остановкой; результата не будет
    fn discard(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Mount,
    Tick,
    Visible,
    Manual,
}

#[derive(Debug)]
enum Command {
    RefreshNow,
}

/// Цикл обновления одного представления. Работает одной задачей tokio,
/// поэтому запросы строго последовательны
pub struct PollingController<T: RefreshTask> {
    task: T,
    config: PollingConfig,
    gate: Arc<dyn MarketGate>,
    schedule: RefreshSchedule,
    visibility: watch::Receiver<bool>,
    commands: mpsc::Receiver<Command>,
    state: watch::Sender<PollingState>,
    cancel: CancellationToken,
}

/// Дескриптор контроллера у представления. Drop останавливает опрос
pub struct PollingHandle {
    name: String,
    visibility: watch::Sender<bool>,
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<PollingState>,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl<T: RefreshTask> PollingController<T> {
    /// Монтирует представление: запускает задачу опроса и возвращает её дескриптор
    pub fn spawn(
        task: T,
        config: PollingConfig,
        gate: Arc<dyn MarketGate>,
        visible: bool,
    ) -> PollingHandle {
        let name = task.name().to_string();
        let (visibility_tx, visibility_rx) = watch::channel(visible);
        let (commands_tx, commands_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(PollingState::Stopped);
        let cancel = CancellationToken::new();

        let schedule = RefreshSchedule::new(config.period, visible);
        let span = info_span!("polling", view = %name, schedule = %schedule.id());

        let controller = PollingController {
            task,
            config,
            gate,
            schedule,
            visibility: visibility_rx,
            commands: commands_rx,
            state: state_tx,
            cancel: cancel.clone(),
        };

        let join = tokio::spawn(controller.run().instrument(span));

        PollingHandle {
            name,
            visibility: visibility_tx,
            commands: commands_tx,
            state: state_rx,
            cancel,
            join: Some(join),
        }
    }

    async fn run(mut self) {
        info!(
            "Polling controller started: period {:?}, gate {:?}, on visible {:?}",
            self.config.period, self.config.tick_gate, self.config.refresh_on_visible
        );

        // Первичная загрузка выполняется всегда, независимо от рыночных часов
        if self.refresh(Trigger::Mount).await {
            if self.schedule.is_visible() {
                self.activate();
            }
            self.event_loop().await;
        }

        self.schedule.disarm();
        self.publish_state();
        info!("Polling controller stopped");
    }

    async fn event_loop(&mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                changed = self.visibility.changed() => {
                    // Отправитель закрыт: представления больше нет
                    if changed.is_err() {
                        break;
                    }
                    let visible = *self.visibility.borrow_and_update();
                    if !self.on_visibility(visible).await {
                        break;
                    }
                }
                Some(command) = self.commands.recv() => {
                    match command {
                        Command::RefreshNow => {
                            if !self.refresh(Trigger::Manual).await {
                                break;
                            }
                        }
                    }
                }
                _ = self.schedule.next_tick() => {
                    if !self.on_tick().await {
                        break;
                    }
                }
            }
        }
    }

    async fn on_visibility(&mut self, visible: bool) -> bool {
        self.schedule.set_visible(visible);

        if !visible {
            if self.schedule.state() == PollingState::Active {
                debug!("View hidden, timer cancelled");
                self.schedule.disarm();
                self.publish_state();
            }
            return true;
        }

        if self.schedule.state() == PollingState::Active {
            return true;
        }

        if self.should_refresh_on_visible() && !self.refresh(Trigger::Visible).await {
            return false;
        }
        debug!("View visible, timer armed");
        self.activate();
        true
    }

    async fn on_tick(&mut self) -> bool {
        if !self.schedule.is_visible() {
            debug!("Tick skipped: view hidden");
            return true;
        }
        if self.config.tick_gate == TickGate::MarketHours && !self.gate.is_open() {
            debug!("Tick skipped: market closed");
            return true;
        }
        self.refresh(Trigger::Tick).await
    }

    fn should_refresh_on_visible(&self) -> bool {
        match self.config.refresh_on_visible {
            RefreshOnVisible::Always => true,
            RefreshOnVisible::WhenMarketOpen => self.gate.is_open(),
            RefreshOnVisible::WhenStale => self.gate.is_open() && self.schedule.is_stale(),
            RefreshOnVisible::Never => false,
        }
    }

    fn activate(&mut self) {
        self.schedule.arm();
        self.publish_state();
    }

    fn publish_state(&self) {
        let state = self.schedule.state();
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    /// false, если контроллер остановлен во время запроса; результат
    /// отбрасывается без применения
    async fn refresh(&mut self, trigger: Trigger) -> bool {
        debug!("Refreshing ({:?})", trigger);
        self.task.begin();

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Discarding in-flight refresh after teardown");
                self.task.discard();
                return false;
            }
            outcome = self.task.fetch() => outcome,
        };

        match &outcome {
            Ok(_) => {
                self.schedule.record_fetch();
                debug!("Refreshed at {:?}", self.schedule.last_fetch_time());
            }
            Err(err) => warn!("Refresh of {} failed ({:?}): {}", self.task.name(), trigger, err),
        }
        self.task.apply(outcome);
        true
    }
}

impl PollingHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PollingState {
        *self.state.borrow()
    }

    pub fn is_visible(&self) -> bool {
        *self.visibility.borrow()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visibility.send_if_modified(|current| {
            if *current == visible {
                return false;
            }
            *current = visible;
            true
        });
    }

    /// Ручное обновление (кнопка Retry). Не зависит от рыночных часов.
    /// false, если контроллер уже остановлен
    pub fn refresh_now(&self) -> bool {
        match self.commands.try_send(Command::RefreshNow) {
            Ok(()) => true,
            // Запрос уже в очереди и покрывает этот
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Отменяет таймер и текущий запрос, затем дожидается завершения задачи
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!("Polling task for {} ended abnormally: {}", self.name, err);
            }
        }
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    struct FakeGate(AtomicBool);

    impl FakeGate {
        fn new(open: bool) -> Arc<Self> {
            Arc::new(Self(AtomicBool::new(open)))
        }

        fn set(&self, open: bool) {
            self.0.store(open, Ordering::SeqCst);
        }
    }

    impl MarketGate for FakeGate {
        fn is_open(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct Recorder {
        fetches: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail: AtomicBool,
        discarded: AtomicUsize,
        applied: Mutex<Vec<Result<usize, String>>>,
    }

    impl Recorder {
        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn applied(&self) -> Vec<Result<usize, String>> {
            self.applied.lock().unwrap().clone()
        }
    }

    struct FakeTask {
        recorder: Arc<Recorder>,
        delay: Duration,
    }

    #[async_trait]
    impl RefreshTask for FakeTask {
        type Output = usize;

        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch(&self) -> Result<usize, FetchError> {
            let n = self.recorder.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.recorder.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.recorder.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.recorder.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.recorder.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Status {
                    status: 502,
                    body: "bad gateway".into(),
                });
            }
            Ok(n)
        }

        fn apply(&self, outcome: Result<usize, FetchError>) {
            self.recorder
                .applied
                .lock()
                .unwrap()
                .push(outcome.map_err(|e| e.to_string()));
        }

        fn discard(&self) {
            self.recorder.discarded.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn spawn_with(
        config: PollingConfig,
        gate: Arc<FakeGate>,
        visible: bool,
        delay: Duration,
    ) -> (PollingHandle, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let task = FakeTask {
            recorder: recorder.clone(),
            delay,
        };
        let handle = PollingController::spawn(task, config, gate, visible);
        (handle, recorder)
    }

    fn spawn(gate: Arc<FakeGate>, visible: bool) -> (PollingHandle, Arc<Recorder>) {
        spawn_with(PollingConfig::default(), gate, visible, Duration::ZERO)
    }

    /// Даёт задачам отработать, не доходя до следующего тика
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    const PERIOD: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_mount_fetches_once_even_when_hidden_and_closed() {
        let (handle, recorder) = spawn(FakeGate::new(false), false);
        settle().await;

        assert_eq!(recorder.fetches(), 1);
        assert_eq!(handle.state(), PollingState::Stopped);

        sleep(PERIOD * 5).await;
        assert_eq!(recorder.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_view_polls_every_period() {
        let (handle, recorder) = spawn(FakeGate::new(true), true);
        settle().await;
        assert_eq!(recorder.fetches(), 1);
        assert_eq!(handle.state(), PollingState::Active);

        sleep(PERIOD).await;
        assert_eq!(recorder.fetches(), 2);

        sleep(PERIOD).await;
        assert_eq!(recorder.fetches(), 3);
        assert_eq!(recorder.applied(), vec![Ok(1), Ok(2), Ok(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_skipped_while_market_closed() {
        let gate = FakeGate::new(false);
        let (handle, recorder) = spawn(gate.clone(), true);
        settle().await;
        assert_eq!(handle.state(), PollingState::Active);

        sleep(PERIOD * 3).await;
        assert_eq!(recorder.fetches(), 1);

        gate.set(true);
        sleep(PERIOD).await;
        assert_eq!(recorder.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ungated_view_ignores_market_hours() {
        let config = PollingConfig {
            tick_gate: TickGate::Always,
            ..PollingConfig::default()
        };
        let (_handle, recorder) = spawn_with(config, FakeGate::new(false), true, Duration::ZERO);
        settle().await;

        sleep(PERIOD * 2).await;
        assert_eq!(recorder.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hide_stops_timer_and_show_refreshes_when_open() {
        let (handle, recorder) = spawn(FakeGate::new(true), true);
        settle().await;

        handle.set_visible(false);
        settle().await;
        assert_eq!(handle.state(), PollingState::Stopped);

        sleep(PERIOD * 3).await;
        assert_eq!(recorder.fetches(), 1);

        handle.set_visible(true);
        settle().await;
        assert_eq!(recorder.fetches(), 2);
        assert_eq!(handle.state(), PollingState::Active);

        sleep(PERIOD).await;
        assert_eq!(recorder.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_while_closed_arms_without_fetching() {
        let (handle, recorder) = spawn(FakeGate::new(false), false);
        settle().await;

        handle.set_visible(true);
        settle().await;
        assert_eq!(recorder.fetches(), 1);
        assert_eq!(handle.state(), PollingState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_on_visible_policies() {
        let always = PollingConfig {
            refresh_on_visible: RefreshOnVisible::Always,
            ..PollingConfig::default()
        };
        let (handle, recorder) = spawn_with(always, FakeGate::new(false), false, Duration::ZERO);
        settle().await;
        handle.set_visible(true);
        settle().await;
        assert_eq!(recorder.fetches(), 2);

        let never = PollingConfig {
            refresh_on_visible: RefreshOnVisible::Never,
            ..PollingConfig::default()
        };
        let (handle, recorder) = spawn_with(never, FakeGate::new(true), false, Duration::ZERO);
        settle().await;
        handle.set_visible(true);
        settle().await;
        assert_eq!(recorder.fetches(), 1);
        assert_eq!(handle.state(), PollingState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_when_stale_only() {
        let config = PollingConfig {
            refresh_on_visible: RefreshOnVisible::WhenStale,
            ..PollingConfig::default()
        };
        let (handle, recorder) = spawn_with(config, FakeGate::new(true), false, Duration::ZERO);
        settle().await;

        // Данные после монтирования свежие, повторной загрузки нет
        handle.set_visible(true);
        settle().await;
        assert_eq!(recorder.fetches(), 1);

        handle.set_visible(false);
        settle().await;
        sleep(PERIOD * 2).await;

        handle.set_visible(true);
        settle().await;
        assert_eq!(recorder.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_and_timer_keeps_running() {
        let (_handle, recorder) = spawn(FakeGate::new(true), true);
        recorder.fail.store(true, Ordering::SeqCst);
        settle().await;

        sleep(PERIOD).await;
        recorder.fail.store(false, Ordering::SeqCst);
        sleep(PERIOD).await;

        let applied = recorder.applied();
        assert_eq!(applied.len(), 3);
        assert!(applied[0].is_err());
        assert!(applied[1].is_err());
        assert_eq!(applied[2], Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_name_and_visibility() {
        let (handle, _recorder) = spawn(FakeGate::new(true), true);
        assert_eq!(handle.name(), "fake");
        assert!(handle.is_visible());

        handle.set_visible(false);
        assert!(!handle.is_visible());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fetch_after_shutdown() {
        let (handle, recorder) = spawn(FakeGate::new(true), true);
        settle().await;
        handle.shutdown().await;

        sleep(PERIOD * 10).await;
        assert_eq!(recorder.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_discarded_after_shutdown() {
        let (handle, recorder) = spawn_with(
            PollingConfig::default(),
            FakeGate::new(true),
            true,
            Duration::from_secs(5),
        );
        settle().await;
        assert_eq!(recorder.fetches(), 1);

        handle.shutdown().await;
        sleep(Duration::from_secs(30)).await;

        assert!(recorder.applied().is_empty());
        assert_eq!(recorder.discarded.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let (handle, recorder) = spawn(FakeGate::new(true), true);
        settle().await;
        drop(handle);

        sleep(PERIOD * 5).await;
        assert_eq!(recorder.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_bypasses_gate() {
        let (handle, recorder) = spawn(FakeGate::new(false), false);
        settle().await;

        assert!(handle.refresh_now());
        settle().await;
        assert_eq!(recorder.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetches_never_overlap() {
        let config = PollingConfig {
            tick_gate: TickGate::Always,
            ..PollingConfig::default()
        };
        let (_handle, recorder) =
            spawn_with(config, FakeGate::new(true), true, Duration::from_secs(90));

        sleep(PERIOD * 10).await;
        assert!(recorder.fetches() >= 3);
        assert_eq!(recorder.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_views_poll_independently() {
        let (first, first_recorder) = spawn(FakeGate::new(true), true);
        let (second, second_recorder) = spawn(FakeGate::new(true), false);
        settle().await;

        sleep(PERIOD * 2).await;
        assert_eq!(first_recorder.fetches(), 3);
        assert_eq!(second_recorder.fetches(), 1);

        futures::future::join_all([first.shutdown(), second.shutdown()]).await;
        sleep(PERIOD * 2).await;
        assert_eq!(first_recorder.fetches(), 3);
    }
}
