use std::collections::BTreeMap;

use crate::model::SystemState;

/// Linear interpolation, `t` in [0, 1].
pub fn lerp(start: f64, end: f64, t: f64) -> f64 {
    start + (end - start) * t
}

/// Hermite smoothstep time warp: motion eases in and out instead of moving
/// linearly. Exactly 0 at t=0 and 1 at t=1, monotonic on [0, 1].
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Synthesize the intermediate state between two snapshots at time `t`.
///
/// Over the union of entity ids:
/// - present in both: `b`'s entity with position lerped `a -> b`, alpha 1;
/// - only in `a` (removed by `b`): `a`'s entity fading out (`1 - t'`);
/// - only in `b` (added by `b`): `b`'s entity fading in (`t'`).
///
/// Summary fields (`owner`, `tag_tally`, `active_count`, `timestamp`) come
/// from `b` unchanged. Pure: inputs are never mutated. Output order is
/// deterministic: `b`'s entities in `b`'s order, then removed entities in
/// `a`'s order.
pub fn interpolate(a: &SystemState, b: &SystemState, t: f64) -> SystemState {
    let eased = ease_in_out(t);

    let by_id_a: BTreeMap<&str, usize> = a
        .people
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();
    let by_id_b: BTreeMap<&str, usize> = b
        .people
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    let mut people = Vec::with_capacity(a.people.len().max(b.people.len()));

    for pb in &b.people {
        let mut p = pb.clone();
        if let Some(&ia) = by_id_a.get(pb.id.as_str()) {
            let pa = &a.people[ia];
            p.x = lerp(pa.x, pb.x, eased);
            p.y = lerp(pa.y, pb.y, eased);
            p.alpha = 1.0;
        } else {
            p.alpha = eased;
        }
        people.push(p);
    }

    for pa in &a.people {
        if !by_id_b.contains_key(pa.id.as_str()) {
            let mut p = pa.clone();
            p.alpha = 1.0 - eased;
            people.push(p);
        }
    }

    SystemState {
        owner: b.owner.clone(),
        people,
        tag_tally: b.tag_tally.clone(),
        active_count: b.active_count,
        timestamp: b.timestamp,
    }
}
