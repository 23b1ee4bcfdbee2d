/// RMS of one slice, bounded to [0, 1].
pub(crate) fn slice_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = energy.sqrt();
    if rms.is_finite() {
        rms.min(1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_constant_signal_is_its_magnitude() {
        let rms = slice_rms(&[0.5, -0.5, 0.5, -0.5]);
        assert!((rms - 0.5).abs() < 1e-6);
        assert_eq!(slice_rms(&[]), 0.0);
    }

    #[test]
    fn rms_is_bounded_and_finite() {
        assert_eq!(slice_rms(&[3.0, -3.0]), 1.0);
        assert_eq!(slice_rms(&[f32::NAN]), 0.0);
    }
}
