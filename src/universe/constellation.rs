use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

use crate::feed::AddressStats;
use crate::scene::{NodeHandle, NodeKind, Scene, SceneNode};
use crate::universe::Color;

/// Where every constellation is rooted, above the block spiral.
pub const CONSTELLATION_ORIGIN: [f64; 3] = [0.0, 30.0, 0.0];
pub const MAX_CONSTELLATION_POINTS: usize = 32;
const CENTER_RADIUS: f64 = 0.6;
const POINT_RADIUS: f64 = 0.12;

/// Seed for an address's decorative scatter, so a given address always
/// lays out the same way.
fn address_seed(address: &str) -> u64 {
    address
        .chars()
        .fold(0u32, |s, c| s.wrapping_mul(31).wrapping_add(c as u32)) as u64
}

/// The visualization of one looked-up address.
#[derive(Debug, Clone)]
pub struct AddressConstellation {
    pub address: String,
    pub stats: AddressStats,
    pub center: NodeHandle,
    pub points: Vec<NodeHandle>,
}

impl AddressConstellation {
    pub fn build(address: &str, stats: AddressStats, scene: &mut Scene) -> Self {
        let center_pos = Vector3::from(CONSTELLATION_ORIGIN);
        let center = scene.add(SceneNode::new(
            NodeKind::AddressCenter,
            center_pos,
            CENTER_RADIUS,
            Color::from_hex(0xff55ff),
        ));

        let mut rng = StdRng::seed_from_u64(address_seed(address));
        let count = address.chars().count().min(MAX_CONSTELLATION_POINTS);
        let points = (0..count)
            .map(|i| {
                let radius = 3.0 + i as f64 * 0.25;
                let angle = rng.gen_range(0.0..TAU);
                let lift = rng.gen_range(-1.25..1.25);
                let position = center_pos
                    + Vector3::new(angle.cos() * radius, lift, angle.sin() * radius);
                scene.add(SceneNode::new(
                    NodeKind::AddressNode,
                    position,
                    POINT_RADIUS,
                    Color::from_hex(0x55aaff),
                ))
            })
            .collect();

        Self {
            address: address.to_string(),
            stats,
            center,
            points,
        }
    }

    /// Every node handle, center first.
    pub fn nodes(&self) -> Vec<NodeHandle> {
        std::iter::once(self.center)
            .chain(self.points.iter().copied())
            .collect()
    }

    pub fn center_position(&self) -> Vector3<f64> {
        Vector3::from(CONSTELLATION_ORIGIN)
    }

    pub fn dispose(self, scene: &mut Scene) {
        for handle in self.nodes() {
            scene.remove(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressConstellation, CONSTELLATION_ORIGIN, MAX_CONSTELLATION_POINTS, address_seed};
    use crate::feed::AddressStats;
    use crate::scene::Scene;
    use nalgebra::Vector3;

    fn layout(address: &str) -> Vec<Vector3<f64>> {
        let mut scene = Scene::new();
        let c = AddressConstellation::build(address, AddressStats::default(), &mut scene);
        c.nodes()
            .iter()
            .map(|h| scene.get(*h).expect("node").position)
            .collect()
    }

    #[test]
    fn same_address_same_layout() {
        let addr = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";
        assert_eq!(layout(addr), layout(addr));
        assert_ne!(layout(addr), layout("bc1qm34lsc65zpw79lxes69zkqmk6ee3ewf0j77s3h"));
    }

    #[test]
    fn seed_folds_every_character() {
        assert_eq!(address_seed(""), 0);
        assert_eq!(address_seed("a"), 97);
        assert_eq!(address_seed("ab"), 97 * 31 + 98);
        assert_ne!(address_seed("ab"), address_seed("ba"));
    }

    #[test]
    fn points_stay_in_their_ring_and_band() {
        let origin = Vector3::from(CONSTELLATION_ORIGIN);
        let points = layout("bc1qxy2kgdygjrsqtzq2n0yrf2493p83kkfjhx0wlh");
        assert_eq!(points[0], origin);
        for (i, p) in points[1..].iter().enumerate() {
            let offset = p - origin;
            let ring = (offset.x * offset.x + offset.z * offset.z).sqrt();
            assert!((ring - (3.0 + i as f64 * 0.25)).abs() < 1e-9);
            assert!(offset.y.abs() <= 1.25);
        }
    }

    #[test]
    fn point_count_is_capped() {
        let long = "bc1q".to_string() + &"x".repeat(60);
        assert_eq!(layout(&long).len(), 1 + MAX_CONSTELLATION_POINTS);
        assert_eq!(layout("1abc").len(), 5);
        assert_eq!(layout("").len(), 1);
    }

    #[test]
    fn dispose_removes_every_node() {
        let mut scene = Scene::new();
        let c = AddressConstellation::build("1BoatSLRHtKNngkdXEeobR76b53LETtpyT", AddressStats::default(), &mut scene);
        assert_eq!(scene.len(), c.nodes().len());
        c.dispose(&mut scene);
        assert!(scene.is_empty());
    }
}
