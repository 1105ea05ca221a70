//! Actor network producing one action distribution per action leaf.
//!
//! # Architecture
//!
//! ```text
//! observation [outer.., obs_shape..]
//!        │ cast to f32, squash outer dims into N
//!        ▼
//! MlpLayers (conv* -> flatten -> dense*)      [N, F]
//!        │ restore outer dims
//!        ▼
//! ┌──────────────┬──────────────┬─────┐
//! │ projection 0 │ projection 1 │ ... │   one per action leaf, in flatten order
//! └──────┬───────┴──────┬───────┴─────┘
//!        ▼              ▼
//!   distributions packed into the action spec's structure
//! ```
//!
//! The network is feed-forward: its state spec is empty and the incoming
//! network state is returned untouched.

use burn::module::Ignored;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::network::{DistributionNetwork, NetworkState, ObservationTensor, StepType};
use super::projection::{
    default_continuous_projection, default_discrete_projection, ProjectionFactory, ProjectionNetwork,
};
use crate::distributions::ActionDistribution;
use crate::error::{NetworkError, Result};
use crate::nn::activation::Activation;
use crate::nn::mlp::{ConvLayerParams, MlpLayers, MlpLayersConfig};
use crate::nn::squash::{outer_rank, BatchSquash};
use crate::specs::{BoundedTensorSpec, DistributionSpec, Nest, TensorSpec};

/// Configuration for [`ActorDistributionNetwork`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorDistributionNetworkConfig {
    /// Units of each dense layer.
    pub fc_layer_params: Vec<usize>,
    /// Convolutions applied before the dense layers; image observations only.
    pub conv_layer_params: Option<Vec<ConvLayerParams>>,
    /// Activation after every hidden layer.
    pub activation: Activation,
    /// Network name, used in log output.
    pub name: String,
}

impl Default for ActorDistributionNetworkConfig {
    fn default() -> Self {
        Self {
            fc_layer_params: vec![200, 100],
            conv_layer_params: None,
            activation: Activation::Relu,
            name: "ActorDistributionNetwork".to_string(),
        }
    }
}

impl ActorDistributionNetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dense layer sizes.
    pub fn with_fc_layer_params(mut self, params: impl Into<Vec<usize>>) -> Self {
        self.fc_layer_params = params.into();
        self
    }

    /// Set the convolution layers.
    pub fn with_conv_layer_params(mut self, params: Option<Vec<ConvLayerParams>>) -> Self {
        self.conv_layer_params = params;
        self
    }

    /// Set the hidden activation.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn mlp_config(&self) -> MlpLayersConfig {
        MlpLayersConfig::new(self.fc_layer_params.clone())
            .with_conv_layer_params(self.conv_layer_params.clone())
            .with_activation(self.activation)
    }

    /// Build with the default categorical and normal projection heads.
    pub fn init<B: Backend>(
        &self,
        observation_spec: Nest<TensorSpec>,
        action_spec: Nest<BoundedTensorSpec>,
        device: &B::Device,
    ) -> Result<ActorDistributionNetwork<B>> {
        self.init_with_projections(
            observation_spec,
            action_spec,
            &default_discrete_projection(),
            &default_continuous_projection(),
            device,
        )
    }

    /// Build with custom projection factories.
    ///
    /// `discrete_projection` is used for integer action leaves and
    /// `continuous_projection` for everything else. Each factory receives
    /// the leaf spec and the size of the hidden features.
    pub fn init_with_projections<B, DF, CF>(
        &self,
        observation_spec: Nest<TensorSpec>,
        action_spec: Nest<BoundedTensorSpec>,
        discrete_projection: &DF,
        continuous_projection: &CF,
        device: &B::Device,
    ) -> Result<ActorDistributionNetwork<B>>
    where
        B: Backend,
        DF: ProjectionFactory<B>,
        CF: ProjectionFactory<B>,
    {
        let observation = single_observation(&observation_spec)?.clone();
        let mlp_layers = self.mlp_config().init(&observation.shape, device)?;

        if action_spec.is_empty() {
            log::warn!("{}: action spec has no tensors, forward will return no distributions", self.name);
        }

        let mut projection_networks = Vec::with_capacity(action_spec.len());
        for leaf in action_spec.flatten() {
            leaf.validate()?;
            let projection = if leaf.is_discrete() {
                discrete_projection.build(leaf, mlp_layers.output_size(), device)?
            } else {
                continuous_projection.build(leaf, mlp_layers.output_size(), device)?
            };
            projection_networks.push(projection);
        }

        let output_spec = action_spec.pack_sequence_as(
            projection_networks
                .iter()
                .map(|projection| projection.output_spec().clone())
                .collect(),
        )?;

        log::debug!(
            "{}: observation {:?}, {} conv + {} dense layers ({} features), {} action heads",
            self.name,
            observation.shape,
            mlp_layers.num_conv_layers(),
            mlp_layers.num_fc_layers(),
            mlp_layers.output_size(),
            projection_networks.len()
        );

        Ok(ActorDistributionNetwork {
            mlp_layers,
            projection_networks,
            observation_spec: Ignored(observation_spec),
            action_spec: Ignored(action_spec),
            output_spec: Ignored(output_spec),
            state_spec: Ignored(Nest::empty()),
            name: Ignored(self.name.clone()),
        })
    }
}

fn single_observation(observation_spec: &Nest<TensorSpec>) -> Result<&TensorSpec> {
    let leaves = observation_spec.flatten();
    match leaves.as_slice() {
        [single] => Ok(*single),
        [] => Err(NetworkError::invalid_spec("observation spec has no tensors")),
        _ => Err(NetworkError::MultipleObservations { count: leaves.len() }),
    }
}

/// Maps a single observation to a nest of action distributions.
#[derive(Module, Debug)]
pub struct ActorDistributionNetwork<B: Backend> {
    mlp_layers: MlpLayers<B>,
    projection_networks: Vec<ProjectionNetwork<B>>,
    observation_spec: Ignored<Nest<TensorSpec>>,
    action_spec: Ignored<Nest<BoundedTensorSpec>>,
    output_spec: Ignored<Nest<DistributionSpec>>,
    state_spec: Ignored<Nest<TensorSpec>>,
    name: Ignored<String>,
}

impl<B: Backend> ActorDistributionNetwork<B> {
    /// The shared feature-extraction stack.
    pub fn mlp_layers(&self) -> &MlpLayers<B> {
        &self.mlp_layers
    }

    /// Projection heads in action-spec flatten order.
    pub fn projection_networks(&self) -> &[ProjectionNetwork<B>] {
        &self.projection_networks
    }

    /// Size of the hidden features fed to the projection heads.
    pub fn hidden_size(&self) -> usize {
        self.mlp_layers.output_size()
    }
}

impl<B: Backend> DistributionNetwork<B> for ActorDistributionNetwork<B> {
    fn name(&self) -> &str {
        &self.name.0
    }

    fn observation_spec(&self) -> &Nest<TensorSpec> {
        &self.observation_spec.0
    }

    fn action_spec(&self) -> &Nest<BoundedTensorSpec> {
        &self.action_spec.0
    }

    fn state_spec(&self) -> &Nest<TensorSpec> {
        &self.state_spec.0
    }

    fn output_spec(&self) -> &Nest<DistributionSpec> {
        &self.output_spec.0
    }

    fn forward<const D: usize>(
        &self,
        observations: Nest<ObservationTensor<B, D>>,
        _step_type: Option<&[StepType]>,
        network_state: NetworkState<B>,
    ) -> Result<(Nest<ActionDistribution<B>>, NetworkState<B>)> {
        if !observations.same_structure(&self.observation_spec.0) {
            return Err(NetworkError::NestStructure {
                expected: self.observation_spec.0.len(),
                actual: observations.len(),
            });
        }
        let spec = single_observation(&self.observation_spec.0)?;
        let observation = observations
            .into_flatten()
            .pop()
            .ok_or_else(|| NetworkError::invalid_spec("observation spec has no tensors"))?;

        let dims = observation.dims();
        let outer_rank = outer_rank(&dims, spec)?;
        if dims[..outer_rank].contains(&0) {
            return Err(NetworkError::unsupported(format!(
                "observation batch {:?} has a zero-sized outer dimension",
                &dims[..outer_rank]
            )));
        }
        let states = observation.into_float();

        let mut squash = BatchSquash::new(outer_rank);
        let hidden = if self.mlp_layers.has_conv() {
            let images: Tensor<B, 4> = squash.flatten(states)?;
            self.mlp_layers.forward_images(images)
        } else {
            self.mlp_layers.forward(squash.flatten_features(states)?)
        };
        let hidden = squash.unflatten(hidden)?;

        let distributions = self
            .projection_networks
            .iter()
            .map(|projection| projection.forward(&hidden, outer_rank))
            .collect::<Result<Vec<_>>>()?;
        let distributions = self.action_spec.0.pack_sequence_as(distributions)?;

        Ok((distributions, network_state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::normal_projection::NormalProjectionNetworkConfig;
    use crate::specs::DistributionKind;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::optim::GradientsParams;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    fn small_config() -> ActorDistributionNetworkConfig {
        ActorDistributionNetworkConfig::new().with_fc_layer_params([16, 8])
    }

    fn obs_batch(dims: [usize; 2]) -> Nest<ObservationTensor<TestBackend, 2>> {
        let device = Default::default();
        Nest::Leaf(Tensor::<TestBackend, 2>::random(dims, Distribution::Normal(0.0, 1.0), &device).into())
    }

    #[test]
    fn test_discrete_action_logits_shape() {
        let device = Default::default();
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                TensorSpec::float([4]).into(),
                BoundedTensorSpec::discrete(Vec::new(), 0, 2).unwrap().into(),
                &device,
            )
            .unwrap();

        let (dists, _) = net.forward(obs_batch([5, 4]), None, Nest::empty()).unwrap();
        let dist = match dists {
            Nest::Leaf(dist) => dist,
            other => panic!("expected a single distribution, got {:?}", other),
        };
        let categorical = dist.as_categorical().expect("categorical");
        assert_eq!(categorical.batch_shape(), &[5]);
        assert_eq!(categorical.logits::<2>().unwrap().dims(), [5, 3]);
        assert_eq!(categorical.mode::<1>().unwrap().dims(), [5]);
    }

    #[test]
    fn test_continuous_action_within_bounds() {
        let device = Default::default();
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                TensorSpec::float([3]).into(),
                BoundedTensorSpec::continuous([2], -2.0, 3.0).unwrap().into(),
                &device,
            )
            .unwrap();

        let observations: Nest<ObservationTensor<TestBackend, 2>> = Nest::Leaf(
            Tensor::<TestBackend, 2>::random([64, 3], Distribution::Normal(0.0, 10.0), &device).into(),
        );
        let (dists, _) = net.forward(observations, None, Nest::empty()).unwrap();
        let normal = dists.flatten()[0].as_normal().expect("normal").clone();

        let loc = normal.loc::<2>().unwrap();
        assert_eq!(loc.dims(), [64, 2]);
        let loc = loc.into_data();
        assert!(loc.as_slice::<f32>().unwrap().iter().all(|v| (-2.0..=3.0).contains(v)));

        // State-independent std starts at softplus(inverse_softplus(0.35)).
        let scale = normal.scale::<2>().unwrap().into_data();
        assert!(scale
            .as_slice::<f32>()
            .unwrap()
            .iter()
            .all(|v| (v - 0.35).abs() < 1e-4));
    }

    #[test]
    fn test_nested_actions_mirror_structure() {
        let device = Default::default();
        let action_spec = Nest::from_entries([
            ("fire", Nest::Leaf(BoundedTensorSpec::discrete(Vec::new(), 0, 1).unwrap())),
            ("move", Nest::Leaf(BoundedTensorSpec::continuous([2], -1.0, 1.0).unwrap())),
        ]);
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(TensorSpec::float([4]).into(), action_spec.clone(), &device)
            .unwrap();

        assert!(net.output_spec().same_structure(&action_spec));
        assert_eq!(net.projection_networks().len(), 2);

        let (dists, _) = net.forward(obs_batch([3, 4]), None, Nest::empty()).unwrap();
        assert!(dists.same_structure(&action_spec));
        match &dists {
            Nest::Map(items) => {
                assert_eq!(items["fire"].flatten()[0].kind(), DistributionKind::Categorical);
                assert_eq!(items["move"].flatten()[0].kind(), DistributionKind::Normal);
                assert_eq!(items["move"].flatten()[0].batch_shape(), &[3, 2]);
            }
            other => panic!("expected a map, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_observations_rejected() {
        let device = Default::default();
        let observation_spec = Nest::Sequence(vec![Nest::Leaf(TensorSpec::float([2])), Nest::Leaf(TensorSpec::float([3]))]);
        let result = small_config().init::<TestBackend>(
            observation_spec,
            BoundedTensorSpec::discrete(Vec::new(), 0, 2).unwrap().into(),
            &device,
        );
        let err = result.unwrap_err();
        assert_eq!(err, NetworkError::MultipleObservations { count: 2 });
        assert!(err.to_string().contains("Only a single observation is supported"));
    }

    #[test]
    fn test_empty_observation_spec_rejected() {
        let device = Default::default();
        let result = small_config().init::<TestBackend>(
            Nest::empty(),
            BoundedTensorSpec::discrete(Vec::new(), 0, 2).unwrap().into(),
            &device,
        );
        assert!(matches!(result, Err(NetworkError::InvalidSpec { .. })));
    }

    #[test]
    fn test_batch_and_time_dims_preserved() {
        let device = Default::default();
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                TensorSpec::float([4]).into(),
                BoundedTensorSpec::discrete([2], 0, 4).unwrap().into(),
                &device,
            )
            .unwrap();

        let observations: Nest<ObservationTensor<TestBackend, 3>> =
            Nest::Leaf(Tensor::<TestBackend, 3>::zeros([2, 3, 4], &device).into());
        let (dists, _) = net.forward(observations, None, Nest::empty()).unwrap();
        let categorical = dists.flatten()[0].as_categorical().expect("categorical").clone();
        assert_eq!(categorical.batch_shape(), &[2, 3, 2]);
        assert_eq!(categorical.logits::<4>().unwrap().dims(), [2, 3, 2, 5]);
    }

    #[test]
    fn test_unbatched_observation() {
        let device = Default::default();
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                TensorSpec::float([4]).into(),
                BoundedTensorSpec::continuous([2], 0.0, 1.0).unwrap().into(),
                &device,
            )
            .unwrap();

        let observations: Nest<ObservationTensor<TestBackend, 1>> =
            Nest::Leaf(Tensor::<TestBackend, 1>::ones([4], &device).into());
        let (dists, _) = net.forward(observations, None, Nest::empty()).unwrap();
        let normal = dists.flatten()[0].as_normal().expect("normal").clone();
        assert_eq!(normal.batch_shape(), &[2]);
        assert_eq!(normal.loc::<1>().unwrap().dims(), [2]);
    }

    #[test]
    fn test_observation_shape_mismatch() {
        let device = Default::default();
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                TensorSpec::float([4]).into(),
                BoundedTensorSpec::discrete(Vec::new(), 0, 2).unwrap().into(),
                &device,
            )
            .unwrap();
        let result = net.forward(obs_batch([5, 3]), None, Nest::empty());
        assert!(matches!(result, Err(NetworkError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_observation_structure_mismatch() {
        let device = Default::default();
        let observation_spec = Nest::from_entries([("state", Nest::Leaf(TensorSpec::float([4])))]);
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                observation_spec,
                BoundedTensorSpec::discrete(Vec::new(), 0, 2).unwrap().into(),
                &device,
            )
            .unwrap();
        let result = net.forward(obs_batch([5, 4]), None, Nest::empty());
        assert!(matches!(result, Err(NetworkError::NestStructure { .. })));
    }

    #[test]
    fn test_network_state_returned_unchanged() {
        let device = Default::default();
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                TensorSpec::float([4]).into(),
                BoundedTensorSpec::discrete(Vec::new(), 0, 2).unwrap().into(),
                &device,
            )
            .unwrap();
        assert!(net.state_spec().is_empty());

        let state: NetworkState<TestBackend> = Nest::Leaf(Tensor::ones([5, 2], &device));
        let steps = [StepType::First; 5];
        let (_, returned) = net.forward(obs_batch([5, 4]), Some(&steps), state).unwrap();
        let returned = returned.into_flatten();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].to_data().as_slice::<f32>().unwrap(), &[1.0; 10]);
    }

    #[test]
    fn test_integer_observations_cast_to_float() {
        let device = Default::default();
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                TensorSpec::new([3], burn::tensor::DType::I64).into(),
                BoundedTensorSpec::discrete(Vec::new(), 0, 3).unwrap().into(),
                &device,
            )
            .unwrap();
        let observations: Nest<ObservationTensor<TestBackend, 2>> =
            Nest::Leaf(Tensor::<TestBackend, 2, Int>::from_ints([[0, 1, 2], [3, 4, 5]], &device).into());
        let (dists, _) = net.forward(observations, None, Nest::empty()).unwrap();
        assert_eq!(dists.flatten()[0].batch_shape(), &[2]);
    }

    #[test]
    fn test_conv_image_observations() {
        let device = Default::default();
        let config = small_config().with_conv_layer_params(Some(vec![(4, 3, 1).into(), (8, 2, 2).into()]));
        let net: ActorDistributionNetwork<TestBackend> = config
            .init(
                TensorSpec::float([8, 8, 3]).into(),
                BoundedTensorSpec::discrete(Vec::new(), 0, 5).unwrap().into(),
                &device,
            )
            .unwrap();
        assert!(net.mlp_layers().has_conv());

        let observations: Nest<ObservationTensor<TestBackend, 5>> = Nest::Leaf(
            Tensor::<TestBackend, 5>::random([2, 3, 8, 8, 3], Distribution::Uniform(0.0, 1.0), &device).into(),
        );
        let (dists, _) = net.forward(observations, None, Nest::empty()).unwrap();
        let categorical = dists.flatten()[0].as_categorical().expect("categorical").clone();
        assert_eq!(categorical.logits::<3>().unwrap().dims(), [2, 3, 6]);
    }

    #[test]
    fn test_custom_continuous_projection() {
        let device = Default::default();
        let factory = NormalProjectionNetworkConfig::new().with_state_dependent_std(true);
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init_with_projections(
                TensorSpec::float([4]).into(),
                BoundedTensorSpec::continuous([3], -1.0, 1.0).unwrap().into(),
                &default_discrete_projection(),
                &factory,
                &device,
            )
            .unwrap();
        match &net.projection_networks()[0] {
            ProjectionNetwork::Normal(normal) => assert!(normal.is_state_dependent_std()),
            other => panic!("expected normal projection, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_action_spec_rejected() {
        let device = Default::default();
        let uneven = BoundedTensorSpec::new([2], burn::tensor::DType::I64, vec![0.0], vec![2.0, 4.0]).unwrap();
        let result = small_config().init::<TestBackend>(TensorSpec::float([4]).into(), uneven.into(), &device);
        assert!(matches!(result, Err(NetworkError::InvalidSpec { .. })));
    }

    #[test]
    fn test_parameter_count() {
        let device = Default::default();
        let net: ActorDistributionNetwork<TestBackend> = small_config()
            .init(
                TensorSpec::float([4]).into(),
                BoundedTensorSpec::continuous([2], -1.0, 1.0).unwrap().into(),
                &device,
            )
            .unwrap();
        // dense 4*16+16, 16*8+8, means 8*2+2, std bias 2
        assert_eq!(net.num_params(), 80 + 136 + 18 + 2);
        assert_eq!(net.name(), "ActorDistributionNetwork");
        assert_eq!(net.hidden_size(), 8);
    }

    #[test]
    fn test_gradients_reach_every_parameter() {
        type AutodiffBackend = Autodiff<TestBackend>;
        let device = Default::default();
        let net: ActorDistributionNetwork<AutodiffBackend> = small_config()
            .init(
                TensorSpec::float([4]).into(),
                BoundedTensorSpec::discrete(Vec::new(), 0, 2).unwrap().into(),
                &device,
            )
            .unwrap();

        let observations: Nest<ObservationTensor<AutodiffBackend, 2>> =
            Nest::Leaf(Tensor::<AutodiffBackend, 2>::random([6, 4], Distribution::Normal(0.0, 1.0), &device).into());
        let (dists, _) = net.forward(observations, None, Nest::empty()).unwrap();
        let probs = dists.flatten()[0].as_categorical().expect("categorical").probs::<2>().unwrap();
        let loss = probs.slice([0..6, 0..1]).mean();

        let grads = GradientsParams::from_grads(loss.backward(), &net);
        // Two dense layers and the logits layer, each with weight and bias.
        assert_eq!(grads.len(), 6);

        let inference = net.valid();
        assert_eq!(inference.num_params(), net.num_params());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ActorDistributionNetworkConfig =
            serde_json::from_str(r#"{"fc_layer_params":[64],"activation":"Tanh"}"#).unwrap();
        assert_eq!(config.fc_layer_params, vec![64]);
        assert_eq!(config.activation, Activation::Tanh);
        assert_eq!(config.conv_layer_params, None);
        assert_eq!(config.name, "ActorDistributionNetwork");
    }
}
