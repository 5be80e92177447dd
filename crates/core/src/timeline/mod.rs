//! Step pacing for module animations.
//!
//! Every step sequence paces itself through [`Pacer::suspend`]. It is the only
//! place a sequence yields, so it is also the only place cancellation is
//! observed.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use crate::{
    scene::{ObjectId, SceneHandle, Vec3},
    ArcadeError, Result,
};

/// Process-wide animation speed. Clones observe the same value.
#[derive(Clone)]
pub struct SpeedControl {
    bits: Arc<AtomicU64>,
}

impl SpeedControl {
    pub fn new(factor: f64) -> Result<Self> {
        let control = Self {
            bits: Arc::new(AtomicU64::new(1.0_f64.to_bits())),
        };
        control.set(factor)?;
        Ok(control)
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Updates the factor. Only suspensions started afterwards see it.
    pub fn set(&self, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ArcadeError::Precondition(format!(
                "speed factor must be positive, got {factor}"
            )));
        }
        self.bits.store(factor.to_bits(), Ordering::Relaxed);
        Ok(())
    }
}

impl Default for SpeedControl {
    fn default() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(1.0_f64.to_bits())),
        }
    }
}

impl fmt::Debug for SpeedControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpeedControl").field(&self.get()).finish()
    }
}

/// Cancellable, speed-scaled suspension bound to one module's cancel token.
#[derive(Clone)]
pub struct Pacer {
    speed: SpeedControl,
    cancel: CancellationToken,
    frame_ms: u64,
}

impl Pacer {
    pub fn new(speed: SpeedControl, cancel: CancellationToken, frame_ms: u64) -> Self {
        Self {
            speed,
            cancel,
            frame_ms: frame_ms.max(1),
        }
    }

    /// Same speed and frame length, observing `cancel` instead.
    pub fn rebind(&self, cancel: CancellationToken) -> Pacer {
        Pacer {
            speed: self.speed.clone(),
            cancel,
            frame_ms: self.frame_ms,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with [`ArcadeError::Cancelled`] once the owner has been torn down.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ArcadeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// `ms` divided by the speed factor as it is right now.
    pub fn scaled(&self, ms: u64) -> Duration {
        Duration::from_secs_f64(ms as f64 / 1000.0 / self.speed.get())
    }

    /// Waits `ms / speed`. A cancel raised before the call or during the wait
    /// ends the suspension with [`ArcadeError::Cancelled`].
    pub async fn suspend(&self, ms: u64) -> Result<()> {
        self.check()?;
        let duration = self.scaled(ms);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ArcadeError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// One animation frame.
    pub async fn frame(&self) -> Result<()> {
        self.suspend(self.frame_ms).await
    }

    /// Moves an object to `to` over roughly `duration_ms`, one frame at a
    /// time. Stops quietly if the object disappears mid-flight.
    pub async fn glide(
        &self,
        scene: &SceneHandle,
        id: ObjectId,
        to: Vec3,
        duration_ms: u64,
    ) -> Result<()> {
        let Some(from) = scene.lock()?.position(id) else {
            return Ok(());
        };
        let frames = (duration_ms / self.frame_ms).max(1);

        for step in 1..=frames {
            self.frame().await?;
            let alpha = step as f32 / frames as f32;
            if !scene.lock()?.set_position(id, from.lerp(to, alpha)) {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Milliseconds needed to cover `distance` at `per_frame` units per frame.
    pub fn duration_for(&self, distance: f32, per_frame: f32) -> u64 {
        if per_frame <= 0.0 {
            return self.frame_ms;
        }
        ((distance.abs() / per_frame).ceil() as u64).max(1) * self.frame_ms
    }
}

impl fmt::Debug for Pacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pacer")
            .field("speed", &self.speed.get())
            .field("cancelled", &self.is_cancelled())
            .field("frame_ms", &self.frame_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::GeometryKind,
        scene::{SceneRegistry, VisualObject},
        NoticeLog, ResourceCache,
    };
    use tokio::time::Instant;

    fn pacer(speed: f64) -> (Pacer, SpeedControl, CancellationToken) {
        let control = SpeedControl::new(speed).unwrap();
        let token = CancellationToken::new();
        (Pacer::new(control.clone(), token.clone(), 16), control, token)
    }

    #[tokio::test(start_paused = true)]
    async fn suspension_is_scaled_by_speed() {
        let (pacer, _, _) = pacer(2.0);
        let start = Instant::now();
        pacer.suspend(1000).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(510));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_call_fails_immediately() {
        let (pacer, _, token) = pacer(1.0);
        token.cancel();
        let start = Instant::now();
        let err = pacer.suspend(1000).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_wait_ends_the_suspension() {
        let (pacer, _, token) = pacer(1.0);
        let waiter = tokio::spawn(async move { pacer.suspend(10_000).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        let outcome = waiter.await.unwrap();
        assert!(matches!(outcome, Err(ArcadeError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn speed_change_only_affects_future_suspensions() {
        let (pacer, control, _) = pacer(1.0);
        let pending = pacer.clone();
        let start = Instant::now();
        let waiter = tokio::spawn(async move { pending.suspend(1000).await });

        tokio::task::yield_now().await;
        control.set(4.0).unwrap();
        waiter.await.unwrap().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));

        let start = Instant::now();
        pacer.suspend(1000).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(250) && elapsed < Duration::from_millis(260));
    }

    #[test]
    fn rejects_non_positive_speed() {
        let control = SpeedControl::default();
        assert!(control.set(0.0).is_err());
        assert!(control.set(f64::NAN).is_err());
        assert_eq!(control.get(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn glide_lands_on_target() {
        let cache = ResourceCache::new();
        let notices = NoticeLog::new();
        let scene = SceneHandle::new(SceneRegistry::new(cache.solid(1).unwrap(), notices));
        let id = scene.lock().unwrap().add(
            VisualObject::new(
                cache.geometry(GeometryKind::Box, &[1.0, 1.0, 1.0]).unwrap(),
                cache.solid(2).unwrap(),
            ),
            None,
            None,
        );

        let (pacer, _, _) = pacer(1.0);
        pacer
            .glide(&scene, id, Vec3::new(4.0, 0.0, 0.0), 160)
            .await
            .unwrap();
        assert_eq!(scene.lock().unwrap().position(id), Some(Vec3::new(4.0, 0.0, 0.0)));
    }
}
