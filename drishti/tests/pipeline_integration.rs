//! End-to-end perception on the synthetic tabletop scene.

mod common;

use drishti::classification::{FeatureConfig, ObjectClassifier};
use drishti::core::types::{CloudPoint, Normal3, Point3D, PointCloud3D, Rgb};
use drishti::engine::{PerceptionPipeline, PipelineConfig};
use drishti::error::{DrishtiError, Result};
use drishti::io::services::NormalEstimationService;
use drishti::io::sim::{SceneBox, TABLE_HEIGHT, demo_scene, tabletop_scene};
use drishti::perception::PcaNormalEstimator;

use common::{BLUE_ORIGIN, GREEN_ORIGIN, RED_ORIGIN, cube_center, sample_model};

fn pipeline() -> PerceptionPipeline {
    let classifier = ObjectClassifier::new(sample_model(), FeatureConfig::default()).unwrap();
    PerceptionPipeline::new(PipelineConfig::default(), classifier)
}

#[test]
fn test_demo_scene_detects_three_objects() {
    let mut pipeline = pipeline();
    let frame = pipeline.process(&demo_scene(), &PcaNormalEstimator::default());

    let mut labels = frame.object_labels();
    labels.sort();
    assert_eq!(labels, vec!["biscuits", "soap", "soap2"]);
    assert_eq!(frame.labels.len(), 3);
    assert_eq!(frame.clusters.len(), 3);

    // Table survives as the plane, nothing of it leaks into the objects
    assert!(frame.segmentation.table.len() > 2500);
    assert!(
        frame
            .segmentation
            .table
            .positions()
            .all(|p| (p.z - TABLE_HEIGHT).abs() < 1e-4)
    );
    assert!(
        frame
            .segmentation
            .objects
            .positions()
            .all(|p| p.z > TABLE_HEIGHT + 0.02)
    );
}

#[test]
fn test_object_centroids_match_cubes() {
    let mut pipeline = pipeline();
    let frame = pipeline.process(&demo_scene(), &PcaNormalEstimator::default());

    for (label, origin) in [
        ("soap", RED_ORIGIN),
        ("biscuits", GREEN_ORIGIN),
        ("soap2", BLUE_ORIGIN),
    ] {
        let object = frame
            .objects
            .iter()
            .find(|o| o.label == label)
            .unwrap_or_else(|| panic!("{label} not detected"));
        let expected = cube_center(origin);
        let centroid = object.centroid();
        assert!(
            centroid.distance(&expected) < 0.015,
            "{label}: centroid {:?} far from {:?}",
            centroid,
            expected
        );
    }
}

#[test]
fn test_label_markers_float_above_objects() {
    let mut pipeline = pipeline();
    let frame = pipeline.process(&demo_scene(), &PcaNormalEstimator::default());

    for (marker, object) in frame.labels.iter().zip(&frame.objects) {
        assert_eq!(marker.text, object.label);
        let (_, max) = object.cloud.bounds().unwrap();
        assert!(marker.position.z > max.z);
    }
}

/// Normal service that fails for the cube on the right (negative y).
struct NoNormalsOnRight;

impl NormalEstimationService for NoNormalsOnRight {
    fn get_normals(&self, cloud: &PointCloud3D) -> Result<Vec<Normal3>> {
        match cloud.centroid() {
            Some(c) if c.y < -0.1 => Err(DrishtiError::Service("no normals".into())),
            _ => Ok(PcaNormalEstimator::default().estimate(cloud)),
        }
    }
}

#[test]
fn test_marker_ids_follow_cluster_index_when_a_cluster_is_dropped() {
    let mut pipeline = pipeline();
    let frame = pipeline.process(&demo_scene(), &NoNormalsOnRight);

    assert_eq!(frame.clusters.len(), 3);
    assert_eq!(frame.objects.len(), 2);
    assert_eq!(frame.labels.len(), 2);

    for (marker, object) in frame.labels.iter().zip(&frame.objects) {
        let cluster = frame
            .segmentation
            .objects
            .extract(&frame.clusters[marker.id], "cluster");
        assert_eq!(cluster.len(), object.cloud.len());
        let centroid = cluster.centroid().unwrap();
        assert!(centroid.distance(&object.centroid()) < 1e-5);
    }
}

#[test]
fn test_cluster_cloud_covers_all_clusters() {
    let mut pipeline = pipeline();
    let frame = pipeline.process(&demo_scene(), &PcaNormalEstimator::default());

    let clustered: usize = frame.clusters.iter().map(|c| c.len()).sum();
    assert_eq!(frame.cluster_cloud.len(), clustered);
}

#[test]
fn test_filter_stages_monotonic() {
    let mut pipeline = pipeline();
    let raw = demo_scene();
    let frame = pipeline.process(&raw, &PcaNormalEstimator::default());

    assert!(frame.stages.no_outliers.len() <= raw.len());
    assert!(frame.stages.downsampled.len() <= frame.stages.no_outliers.len());
    assert!(frame.stages.cropped.len() <= frame.stages.downsampled.len());
}

#[test]
fn test_small_clusters_are_not_objects() {
    // 3x3x3 = 27 points, below the default minimum cluster size
    let scene = tabletop_scene(&[
        SceneBox::new(GREEN_ORIGIN, 6, Rgb::new(0, 255, 0)),
        SceneBox::new(RED_ORIGIN, 3, Rgb::new(255, 0, 0)),
    ]);
    let mut pipeline = pipeline();
    let frame = pipeline.process(&scene, &PcaNormalEstimator::default());

    assert_eq!(frame.object_labels(), vec!["biscuits"]);
}

#[test]
fn test_empty_table_yields_no_objects() {
    let mut pipeline = pipeline();
    let frame = pipeline.process(&tabletop_scene(&[]), &PcaNormalEstimator::default());

    assert!(frame.objects.is_empty());
    assert!(frame.labels.is_empty());
    assert!(!frame.segmentation.table.is_empty());
}

#[test]
fn test_cloud_below_crop_is_dropped() {
    let mut cloud = demo_scene();
    for p in cloud.points.iter_mut() {
        p.position = p.position - Point3D::new(0.0, 0.0, 0.5);
    }
    cloud.push(CloudPoint::new(Point3D::new(0.5, 0.0, 0.1), Rgb::WHITE));

    let mut pipeline = pipeline();
    let frame = pipeline.process(&cloud, &PcaNormalEstimator::default());

    assert!(frame.stages.cropped.is_empty());
    assert!(frame.objects.is_empty());
}
