use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::DominoError;
use super::frame::Tensor;

/// Raw detector output for one frame: parallel arrays of length N.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionOutput {
    /// `[y_min, x_min, y_max, x_max]`, normalized to [0, 1].
    pub boxes: Vec<[f32; 4]>,
    pub scores: Vec<f32>,
    pub classes: Vec<f32>,
}

impl DetectionOutput {
    pub fn len(&self) -> usize {
        self.boxes.len().min(self.scores.len()).min(self.classes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tile detector. Implementations must treat the input tensor as read-only.
pub trait DetectionModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn infer(&self, input: &Tensor) -> Result<DetectionOutput, DominoError>;
}

/// Pip classifier model: one tile half in, a class distribution out.
pub trait ClassificationModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn infer(&self, input: &Tensor) -> Result<Vec<f32>, DominoError>;
}

/// Index of the highest score. Ties go to the lowest index; NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

enum MockDetections {
    Fixed(DetectionOutput),
    Sequence(Vec<DetectionOutput>),
    Failing,
}

/// Scripted detector for tests and demos.
pub struct MockDetectionModel {
    detections: MockDetections,
    calls: AtomicUsize,
}

impl MockDetectionModel {
    pub fn new() -> Self {
        Self::with_output(DetectionOutput::default())
    }

    pub fn with_output(output: DetectionOutput) -> Self {
        Self {
            detections: MockDetections::Fixed(output),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the n-th output on the n-th call, then empty outputs.
    pub fn with_sequence(outputs: Vec<DetectionOutput>) -> Self {
        Self {
            detections: MockDetections::Sequence(outputs),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            detections: MockDetections::Failing,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockDetectionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionModel for MockDetectionModel {
    fn name(&self) -> &'static str {
        "mock-detector"
    }

    fn infer(&self, _input: &Tensor) -> Result<DetectionOutput, DominoError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.detections {
            MockDetections::Fixed(output) => Ok(output.clone()),
            MockDetections::Sequence(outputs) => {
                Ok(outputs.get(call).cloned().unwrap_or_default())
            }
            MockDetections::Failing => {
                Err(DominoError::Inference("mock detector failure".into()))
            }
        }
    }
}

type ClassPattern = Box<dyn Fn(&Tensor) -> usize + Send + Sync>;

/// Scripted pip classifier: emits a one-hot distribution over `num_classes`.
pub struct MockClassificationModel {
    num_classes: usize,
    pattern: Option<ClassPattern>,
}

impl MockClassificationModel {
    pub fn with_class(class: usize) -> Self {
        Self::with_pattern(move |_| class)
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&Tensor) -> usize + Send + Sync + 'static,
    {
        Self {
            num_classes: 10,
            pattern: Some(Box::new(pattern)),
        }
    }

    pub fn failing() -> Self {
        Self {
            num_classes: 10,
            pattern: None,
        }
    }
}

impl ClassificationModel for MockClassificationModel {
    fn name(&self) -> &'static str {
        "mock-classifier"
    }

    fn infer(&self, input: &Tensor) -> Result<Vec<f32>, DominoError> {
        let pattern = self
            .pattern
            .as_ref()
            .ok_or_else(|| DominoError::Inference("mock classifier failure".into()))?;

        let class = pattern(input);
        let mut distribution = vec![0.0f32; self.num_classes.max(class + 1)];
        distribution[class] = 1.0;
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_tensor() -> Tensor {
        Tensor {
            shape: [1, 1, 1, 3],
            data: vec![0.0; 3],
        }
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[f32::NAN, 0.2]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_output_len_uses_shortest_array() {
        let output = DetectionOutput {
            boxes: vec![[0.0; 4]; 3],
            scores: vec![0.9, 0.8],
            classes: vec![1.0; 3],
        };
        assert_eq!(output.len(), 2);
        assert!(DetectionOutput::default().is_empty());
    }

    #[test]
    fn test_mock_detector_sequence() {
        let first = DetectionOutput {
            boxes: vec![[0.1, 0.1, 0.2, 0.2]],
            scores: vec![0.9],
            classes: vec![0.0],
        };
        let detector = MockDetectionModel::with_sequence(vec![first.clone()]);

        assert_eq!(detector.infer(&empty_tensor()).unwrap(), first);
        assert!(detector.infer(&empty_tensor()).unwrap().is_empty());
        assert_eq!(detector.call_count(), 2);
    }

    #[test]
    fn test_mock_classifier() {
        let model = MockClassificationModel::with_class(4);
        let distribution = model.infer(&empty_tensor()).unwrap();
        assert_eq!(distribution.len(), 10);
        assert_eq!(argmax(&distribution), Some(4));

        assert!(MockClassificationModel::failing().infer(&empty_tensor()).is_err());
        assert!(MockDetectionModel::failing().infer(&empty_tensor()).is_err());
    }
}
