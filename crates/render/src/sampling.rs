//! Pixel sample placement.

/// Stratified sub-pixel sample positions for one pixel.
///
/// Positions are offsets in `[0, 1)` within the pixel. Each of the
/// `nx × ny` strata receives one sample, jittered by up to `jitter` of the
/// stratum size. The jitter sequence is seeded by the pixel index alone so a
/// pixel always gets the same samples regardless of which worker renders it.
pub fn stratified(pixel: u64, nx: u32, ny: u32, jitter: f32) -> impl Iterator<Item = (f32, f32)> {
    let mut rng = SplitMix64::new(pixel);
    let (nx, ny) = (nx.max(1), ny.max(1));
    (0..ny).flat_map(move |j| (0..nx).map(move |i| (i, j))).map(move |(i, j)| {
        let dx = (rng.next_f32() - 0.5) * jitter;
        let dy = (rng.next_f32() - 0.5) * jitter;
        (
            (i as f32 + 0.5 + dx) / nx as f32,
            (j as f32 + 0.5 + dy) / ny as f32,
        )
    })
}

/// Small deterministic generator built on the splitmix64 finalizer.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unjittered_samples_sit_at_stratum_centres() {
        let samples: Vec<_> = stratified(7, 2, 2, 0.0).collect();
        assert_eq!(
            samples,
            vec![(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)]
        );
    }

    #[test]
    fn jittered_samples_stay_in_their_stratum() {
        for pixel in 0..64 {
            for (k, (x, y)) in stratified(pixel, 3, 3, 1.0).enumerate() {
                let (i, j) = ((k % 3) as f32, (k / 3) as f32);
                assert!(x >= i / 3.0 && x <= (i + 1.0) / 3.0);
                assert!(y >= j / 3.0 && y <= (j + 1.0) / 3.0);
            }
        }
    }

    #[test]
    fn samples_are_deterministic_per_pixel() {
        let a: Vec<_> = stratified(42, 3, 3, 1.0).collect();
        let b: Vec<_> = stratified(42, 3, 3, 1.0).collect();
        let c: Vec<_> = stratified(43, 3, 3, 1.0).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn unit_interval() {
        let mut rng = SplitMix64::new(0);
        for _ in 0..1000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
