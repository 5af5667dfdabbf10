use qte_schemas::{MarketSnapshot, VolumeProfile};

/// Computes volume-based breadth metrics.
pub fn compute_volume_profile(snapshot: &MarketSnapshot) -> VolumeProfile {
    let mut up_volume: u128 = 0;
    let mut down_volume: u128 = 0;
    let mut total_volume: u128 = 0;
    let mut advancing_symbols = 0i64;
    let mut declining_symbols = 0i64;

    for q in &snapshot.quotes {
        let cp = q.change_percent();
        total_volume += q.volume as u128;
        if cp.is_sign_positive() && !cp.is_zero() {
            up_volume += q.volume as u128;
            advancing_symbols += 1;
        } else if cp.is_sign_negative() {
            down_volume += q.volume as u128;
            declining_symbols += 1;
        }
    }

    let up_volume_ratio = if total_volume == 0 {
        0.5
    } else {
        up_volume as f64 / total_volume as f64
    };

    // Institutional-flow proxy: large aggregate volume skew toward advancers
    // relative to the number of advancing names, i.e. volume concentrated in
    // fewer, bigger hands rather than spread evenly.
    let institutional_flow_proxy = if advancing_symbols + declining_symbols == 0 {
        0.0
    } else {
        (up_volume as f64 - down_volume as f64) / total_volume.max(1) as f64
    };

    VolumeProfile {
        up_volume_ratio,
        volume_breadth: (advancing_symbols - declining_symbols) as f64,
        institutional_flow_proxy,
    }
}
