//! Per-frame perception pipeline.
//!
//! ```text
//! raw ─► FilterChain ─► SceneSegmenter ─┬─► table
//!                                       └─► objects ─► clusters ─► classify ─► DetectedObject
//! ```
//!
//! A cluster that cannot be classified is dropped with a warning; the rest
//! of the frame continues.

use crate::classification::ObjectClassifier;
use crate::core::types::{DetectedObject, PointCloud3D};
use crate::io::services::NormalEstimationService;
use crate::perception::{
    Cluster, ClusterConfig, ClusterPalette, EuclideanClusterExtractor, FilterChain,
    FilterChainConfig, FilteredStages, LabelMarker, SceneSegmenter, Segmentation,
    SegmentationConfig, cluster_mask_cloud,
};

/// Configuration for the whole perception pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    pub filter: FilterChainConfig,
    pub segmentation: SegmentationConfig,
    pub clustering: ClusterConfig,
}

/// Everything one frame produced.
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    /// Filter chain intermediates
    pub stages: FilteredStages,
    /// Table and object split
    pub segmentation: Segmentation,
    /// Accepted clusters (indices into `segmentation.objects`)
    pub clusters: Vec<Cluster>,
    /// All clustered points, colored by cluster
    pub cluster_cloud: PointCloud3D,
    /// Classified objects, in cluster order
    pub objects: Vec<DetectedObject>,
    /// One label marker per classified object
    pub labels: Vec<LabelMarker>,
}

impl FrameResult {
    pub fn object_labels(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.label.as_str()).collect()
    }
}

/// Filter, segment, cluster and classify one frame.
pub struct PerceptionPipeline {
    chain: FilterChain,
    segmenter: SceneSegmenter,
    clusterer: EuclideanClusterExtractor,
    classifier: ObjectClassifier,
    palette: ClusterPalette,
}

impl PerceptionPipeline {
    pub fn new(config: PipelineConfig, classifier: ObjectClassifier) -> Self {
        Self {
            chain: FilterChain::new(config.filter),
            segmenter: SceneSegmenter::new(config.segmentation),
            clusterer: EuclideanClusterExtractor::new(config.clustering),
            classifier,
            palette: ClusterPalette::default(),
        }
    }

    /// Run every stage on one raw cloud.
    pub fn process(
        &mut self,
        raw: &PointCloud3D,
        normals: &dyn NormalEstimationService,
    ) -> FrameResult {
        let stages = self.chain.process(raw);
        log::info!(
            "Filtered: {} raw, {} after outliers, {} downsampled, {} cropped",
            raw.len(),
            stages.no_outliers.len(),
            stages.downsampled.len(),
            stages.cropped.len()
        );

        let segmentation = self.segmenter.segment(&stages.cropped);
        let clusters = self.clusterer.extract(&segmentation.objects);
        let cluster_cloud = cluster_mask_cloud(&segmentation.objects, &clusters, &mut self.palette);

        let mut objects = Vec::with_capacity(clusters.len());
        let mut labels = Vec::with_capacity(clusters.len());
        for (i, cluster) in clusters.iter().enumerate() {
            let cloud = segmentation
                .objects
                .extract(cluster, format!("cluster_{i}"));
            let label = match normals
                .get_normals(&cloud)
                .and_then(|n| self.classifier.classify(&cloud, &n))
            {
                Ok(label) => label,
                Err(e) => {
                    log::warn!("Dropping cluster {} ({} points): {}", i, cloud.len(), e);
                    continue;
                }
            };

            let Some(anchor) = cloud.points.first().map(|p| p.position) else {
                continue;
            };
            let Some(object) = DetectedObject::new(label, cloud) else {
                continue;
            };
            labels.push(LabelMarker::above(i, object.label.clone(), anchor));
            objects.push(object);
        }

        let names: Vec<&str> = objects.iter().map(|o| o.label.as_str()).collect();
        log::info!("Detected {} objects: {:?}", objects.len(), names);

        FrameResult {
            stages,
            segmentation,
            clusters,
            cluster_cloud,
            objects,
            labels,
        }
    }
}
