use std::cell::Cell;

use glam::{DMat4, Mat4};

use crate::math::CullSettings;

/// Hook around the near/far clamp of a camera's projection matrix.
///
/// Implementations observe or replace the host's clamp. The double-precision
/// entry point is the one render passes call.
pub trait ClampProjectionCallback {
    fn clamp_projection(&self, projection: &mut DMat4, znear: &mut f64, zfar: &mut f64) -> bool;

    /// Reduced-precision entry point.
    ///
    /// Not used by the draping pipeline. The default warns and clamps
    /// without recording anything.
    fn clamp_projection_f32(&self, projection: &mut Mat4, znear: &mut f64, zfar: &mut f64) -> bool {
        clamp_uncaptured_f32(&CullSettings::default(), projection, znear, zfar)
    }
}

/// Single-precision clamp through `cull`, widened to f64 and back.
///
/// Warns on every call: nothing on this path is recorded.
fn clamp_uncaptured_f32(
    cull: &CullSettings,
    projection: &mut Mat4,
    znear: &mut f64,
    zfar: &mut f64,
) -> bool {
    log::warn!("single-precision projection clamp requested; result is not captured");
    let mut wide = projection.as_dmat4();
    let clamped = cull.clamp_projection(&mut wide, znear, zfar);
    *projection = wide.as_mat4();
    clamped
}

/// Records the projection matrix the offscreen pass actually renders with.
///
/// Prime it with the active cull settings before the pass; the clamp result
/// is passed through unchanged and a copy is kept as
/// [`captured`](Self::captured).
#[derive(Debug, Default)]
pub struct CapturingClamp {
    active: Cell<Option<CullSettings>>,
    captured: Cell<Option<DMat4>>,
}

impl CapturingClamp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the traversal whose clamp algorithm is delegated to.
    #[inline]
    pub fn prime(&self, cull: CullSettings) {
        self.active.set(Some(cull));
    }

    /// Drops the traversal binding once the pass is recorded.
    #[inline]
    pub fn release(&self) {
        self.active.set(None);
    }

    #[inline]
    pub fn is_primed(&self) -> bool {
        self.active.get().is_some()
    }

    /// Last clamped projection, if a clamp ran.
    #[inline]
    pub fn captured(&self) -> Option<DMat4> {
        self.captured.get()
    }

    /// Forgets the last capture so a frame without a clamp is detectable.
    #[inline]
    pub fn reset(&self) {
        self.captured.set(None);
    }

    fn cull(&self) -> CullSettings {
        self.active.get().unwrap_or_else(|| {
            log::debug!("projection clamp outside a primed pass; using default cull settings");
            CullSettings::default()
        })
    }
}

impl ClampProjectionCallback for CapturingClamp {
    fn clamp_projection(&self, projection: &mut DMat4, znear: &mut f64, zfar: &mut f64) -> bool {
        let clamped = self.cull().clamp_projection(projection, znear, zfar);
        self.captured.set(Some(*projection));
        clamped
    }

    fn clamp_projection_f32(&self, projection: &mut Mat4, znear: &mut f64, zfar: &mut f64) -> bool {
        clamp_uncaptured_f32(&self.cull(), projection, znear, zfar)
    }
}
