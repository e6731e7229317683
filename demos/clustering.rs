//! DBSCAN and OPTICS on a simple 2D dataset.
//!
//! Run with `RUST_LOG=kdscan=debug` to see the library's tracing output.

use kdscan::cluster::PointClass;
use kdscan::{ClusteringResult, Dbscan, Optics, XiParams, NOISE};
use tracing_subscriber::EnvFilter;

fn tag(label: usize) -> String {
    if label == NOISE {
        "NOISE".to_string()
    } else {
        format!("cluster {}", label)
    }
}

fn main() -> kdscan::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Three well-separated clusters in 2D plus one outlier.
    let points: Vec<(f32, f32)> = vec![
        // Cluster A (near origin)
        (0.0, 0.0),
        (0.1, 0.2),
        (0.2, 0.1),
        (-0.1, 0.1),
        // Cluster B (near (5, 5))
        (5.0, 5.0),
        (5.1, 4.9),
        (4.9, 5.1),
        (5.2, 5.2),
        // Cluster C (near (10, 0))
        (10.0, 0.0),
        (10.1, 0.1),
        (9.9, -0.1),
        (10.2, 0.2),
        // Outlier
        (20.0, 20.0),
    ];
    let (x, y): (Vec<f32>, Vec<f32>) = points.iter().copied().unzip();

    // --- DBSCAN (eps=1.0, min_pts=3) ---
    let dbscan = Dbscan::new(1.0, 3).run_xy(&x, &y)?;
    println!("=== DBSCAN (eps=1.0, min_pts=3) ===");
    for (i, &label) in dbscan.cluster_ids().iter().enumerate() {
        println!("  point {:2} ({:5.1}, {:5.1}) => {}", i, x[i], y[i], tag(label));
    }

    // --- OPTICS (min_pts=3, generating distance 8.0) ---
    let mut optics = Optics::new(3, 8.0).run_xy(&x, &y)?;
    println!("\n=== OPTICS ordering (min_pts=3, eps=8.0) ===");
    for e in optics.order() {
        let class = match optics.point_class(e.parent) {
            PointClass::Core => "core",
            PointClass::Border => "border",
            PointClass::Noise => "noise",
        };
        println!(
            "  point {:2}  reach {:>8.3}  core {:>8.3}  {}",
            e.parent, e.reachability_distance, e.core_distance, class
        );
    }

    let k = optics.extract_dbscan_clustering(1.0, false)?;
    println!("\n=== OPTICS cut at eps'=1.0: {} clusters ===", k);
    for id in 1..=k {
        let members = optics.cluster_members(id);
        let area = optics.convex_hull(id).map_or(0.0, |h| h.area());
        println!("  cluster {}: {:?} (hull area {:.3})", id, members, area);
    }

    let k = optics.extract_clusters(&XiParams::new(0.3).with_min_cluster_size(3))?;
    println!("\n=== OPTICS xi=0.3: {} clusters ===", k);
    for c in optics.all_clusters() {
        println!(
            "  cluster {} positions {}..={} level {} ({} children)",
            c.cluster_id,
            c.start,
            c.end,
            c.level,
            c.children.len()
        );
    }
    Ok(())
}
