/// 경매 자동 종료 스케줄러
/// 주기적으로 종료 시간이 지난 활성 경매를 찾아 자동 종료한다.
/// 스윕은 겹치지 않으며, 진행 중인 스윕이 있으면 해당 틱은 건너뛴다.
// region:    --- Imports
use crate::clock::Clock;
use crate::lifecycle::manager::LifecycleManager;
use crate::store::AuctionStore;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Sweep Report
/// 스윕 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub ended: usize,
    pub failed: usize,
}
// endregion: --- Sweep Report

// region:    --- Auction Scheduler
/// 경매 자동 종료 스케줄러
pub struct AuctionScheduler {
    lifecycle: Arc<LifecycleManager>,
    store: Arc<dyn AuctionStore>,
    clock: Arc<dyn Clock>,
    period: Duration,
    // 스윕 진행 중 표시
    sweep_guard: Mutex<()>,
}

impl AuctionScheduler {
    pub fn new(
        lifecycle: Arc<LifecycleManager>,
        store: Arc<dyn AuctionStore>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> Self {
        Self {
            lifecycle,
            store,
            clock,
            period,
            sweep_guard: Mutex::new(()),
        }
    }

    /// 스윕 1회 실행
    /// 다른 스윕이 진행 중이면 None
    pub async fn run_sweep(&self) -> Option<SweepReport> {
        let Ok(_guard) = self.sweep_guard.try_lock() else {
            debug!("{:<12} --> 이전 스윕 진행 중, 이번 틱 생략", "Scheduler");
            return None;
        };

        let now = self.clock.now();
        let mut report = SweepReport::default();

        let expired = match self.store.find_expired(now).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("{:<12} --> 만료 경매 조회 실패: {:?}", "Scheduler", e);
                return Some(report);
            }
        };
        report.examined = expired.len();

        // 한 경매의 실패가 나머지 경매 처리를 막지 않음
        for auction_id in expired {
            match self.lifecycle.expire(auction_id).await {
                Ok(true) => report.ended += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    error!(
                        "{:<12} --> 경매 자동 종료 실패 id: {}, {:?}",
                        "Scheduler", auction_id, e
                    );
                }
            }
        }

        if report.examined > 0 {
            info!(
                "{:<12} --> 자동 종료 스윕 완료: 대상 {}, 종료 {}, 실패 {}",
                "Scheduler", report.examined, report.ended, report.failed
            );
        }
        Some(report)
    }

    /// 스케줄러 시작
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(
                "{:<12} --> 스케줄러 시작 (주기: {:?})",
                "Scheduler", self.period
            );

            // 아직 끝나지 않은 스윕 태스크
            let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        in_flight.retain(|sweep| !sweep.is_finished());
                        let scheduler = Arc::clone(&self);
                        // 스윕 패닉은 해당 틱에서만 처리하고 다음 틱은 계속 진행
                        in_flight.push(tokio::spawn(async move {
                            let sweep = tokio::spawn(async move { scheduler.run_sweep().await });
                            if let Err(e) = sweep.await {
                                error!("{:<12} --> 스윕 태스크 비정상 종료: {:?}", "Scheduler", e);
                            }
                        }));
                    }
                    _ = &mut stop_rx => break,
                }
            }

            if !in_flight.is_empty() {
                debug!("{:<12} --> 진행 중인 스윕 종료 대기", "Scheduler");
            }
            for sweep in in_flight {
                if let Err(e) = sweep.await {
                    error!("{:<12} --> 스윕 태스크 비정상 종료: {:?}", "Scheduler", e);
                }
            }
            info!("{:<12} --> 스케줄러 중지", "Scheduler");
        });

        SchedulerHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

/// 실행 중인 스케줄러 핸들
pub struct SchedulerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// 스케줄러 중지 후 루프와 진행 중인 스윕이 끝날 때까지 대기
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            error!("{:<12} --> 스케줄러 종료 오류: {:?}", "Scheduler", e);
        }
    }
}
// endregion: --- Auction Scheduler

// endregion: --- Tests
