//! The earth scene: a tilted globe built from four stacked sphere layers,
//! a starfield backdrop, and a directional sun.

use std::sync::Arc;

use glam::{Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use terra_config::{Config, SceneConfig};
use terra_materials::{
    BasicMaterial, Blending, Color, FresnelConfig, FresnelMaterialFactory, MaterialDescriptor,
    PhongMaterial, RenderState, StandardMaterial, TextureRef,
};
use terra_space::{StarfieldConfig, StarfieldGenerator};

use crate::{DirectionalLight, NodeId, NodeKind, Scene, SceneError, SphereGeometry, Transform};

pub const EARTH_MAP: &str = "00_earthmap1k.jpg";
pub const EARTH_BUMP: &str = "01_earthbump1k.jpg";
pub const EARTH_SPECULAR: &str = "02_earthspec1k.jpg";
pub const EARTH_LIGHTS: &str = "03_earthlights1k.jpg";
pub const CLOUD_MAP: &str = "04_earthcloudmap.jpg";
pub const CLOUD_ALPHA: &str = "05_earthcloudmaptrans.jpg";

pub const BUMP_SCALE: f32 = 0.04;
/// Cloud shell radius relative to the surface.
pub const CLOUD_SCALE: f32 = 1.003;
/// Glow shell radius relative to the surface.
pub const GLOW_SCALE: f32 = 1.01;

/// Per-tick rotation rates in radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinRates {
    /// Surface, night lights and glow.
    pub earth: f32,
    pub clouds: f32,
    pub stars: f32,
}

/// Assembled earth scene with handles to the animated nodes.
#[derive(Clone, Debug)]
pub struct EarthScene {
    pub scene: Scene,
    pub geometry: Arc<SphereGeometry>,
    pub earth_group: NodeId,
    pub surface: NodeId,
    pub lights: NodeId,
    pub clouds: NodeId,
    pub glow: NodeId,
    pub stars: NodeId,
    pub sun: DirectionalLight,
    pub spin: SpinRates,
    ticks: u64,
}

impl EarthScene {
    /// Build the scene from config, drawing starfield randomness from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError`] for an invalid star count or glow/sun color.
    pub fn build<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Self, SceneError> {
        let scene_cfg = &config.scene;

        let starfield = StarfieldConfig::from_count(scene_cfg.num_stars)?;
        let glow_config = FresnelConfig::from_hex(scene_cfg.glow_rim_hex, scene_cfg.glow_facing_hex)?;
        let glow_material = FresnelMaterialFactory::build(&glow_config)?;
        let sun = DirectionalLight {
            color: Color::from_hex(scene_cfg.sun.color_hex)?,
            intensity: scene_cfg.sun.intensity,
            position: Vec3::from_array(scene_cfg.sun.position),
            target: Vec3::ZERO,
        };

        let surface_material = MaterialDescriptor::from(PhongMaterial {
            map: Some(TextureRef::new(EARTH_MAP)),
            specular_map: Some(TextureRef::new(EARTH_SPECULAR)),
            bump_map: Some(TextureRef::new(EARTH_BUMP)),
            bump_scale: BUMP_SCALE,
            ..PhongMaterial::default()
        })
        .validated()?;

        let lights_material = MaterialDescriptor::from(BasicMaterial {
            map: Some(TextureRef::new(EARTH_LIGHTS)),
            state: RenderState {
                blending: Blending::Additive,
                ..RenderState::default()
            },
            ..BasicMaterial::default()
        })
        .validated()?;

        let clouds_material = MaterialDescriptor::from(StandardMaterial {
            map: Some(TextureRef::new(CLOUD_MAP)),
            alpha_map: Some(TextureRef::new(CLOUD_ALPHA)),
            state: RenderState {
                transparent: true,
                opacity: scene_cfg.cloud_opacity,
                blending: Blending::Additive,
                alpha_test: scene_cfg.cloud_alpha_test,
                ..RenderState::default()
            },
            ..StandardMaterial::default()
        })
        .validated()?;

        let geometry = Arc::new(SphereGeometry::icosphere(1.0, config.render.sphere_detail));
        let cloud = StarfieldGenerator::generate(&starfield, rng);

        let mut scene = Scene::new();
        let tilt = Quat::from_rotation_z(-scene_cfg.axial_tilt_deg.to_radians());
        let earth_group = scene.add("earth", None, Transform::from_rotation(tilt), NodeKind::Group);

        let mesh = |material: MaterialDescriptor| NodeKind::Mesh {
            geometry: Arc::clone(&geometry),
            material,
        };
        let surface = scene.add(
            "surface",
            Some(earth_group),
            Transform::IDENTITY,
            mesh(surface_material),
        );
        let lights = scene.add(
            "lights",
            Some(earth_group),
            Transform::IDENTITY,
            mesh(lights_material),
        );
        let clouds = scene.add(
            "clouds",
            Some(earth_group),
            Transform::from_uniform_scale(CLOUD_SCALE),
            mesh(clouds_material),
        );
        let glow = scene.add(
            "glow",
            Some(earth_group),
            Transform::from_uniform_scale(GLOW_SCALE),
            mesh(MaterialDescriptor::Shader(glow_material)),
        );
        let stars = scene.add(
            "stars",
            None,
            Transform::IDENTITY,
            NodeKind::Points(Arc::new(cloud)),
        );

        log::info!(
            "Built earth scene: {} sphere triangles, {} stars",
            geometry.triangle_count(),
            starfield.num_stars
        );

        Ok(Self {
            scene,
            geometry,
            earth_group,
            surface,
            lights,
            clouds,
            glow,
            stars,
            sun,
            spin: SpinRates {
                earth: scene_cfg.earth_spin,
                clouds: scene_cfg.cloud_spin,
                stars: scene_cfg.star_spin,
            },
            ticks: 0,
        })
    }

    /// Build with the configured star seed, or a random one when unset.
    pub fn from_config(config: &Config) -> Result<Self, SceneError> {
        match config.scene.star_seed {
            Some(seed) => Self::build(config, &mut ChaCha8Rng::seed_from_u64(seed)),
            None => Self::build(config, &mut rand::rng()),
        }
    }

    /// Advance the spin animation by one simulation tick.
    pub fn tick(&mut self) {
        for (id, rate) in [
            (self.surface, self.spin.earth),
            (self.lights, self.spin.earth),
            (self.glow, self.spin.earth),
            (self.clouds, self.spin.clouds),
            (self.stars, self.spin.stars),
        ] {
            if let Some(node) = self.scene.get_mut(id) {
                node.transform.rotate_local_y(rate);
            }
        }
        self.ticks += 1;
    }

    /// Number of ticks applied since the scene was built.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Apply the settings a running scene can change in place: spin rates,
    /// cloud opacity and alpha test, glow colors and the sun.
    ///
    /// Everything is validated before anything changes, so on error the
    /// scene is left as it was. Star count, seed, texture directory and tilt
    /// need a rebuild; see [`restart_required`].
    pub fn apply_live_settings(&mut self, config: &SceneConfig) -> Result<(), SceneError> {
        let clouds = match self.material(self.clouds) {
            Some(MaterialDescriptor::Standard(m)) => {
                let mut m = m.clone();
                m.state.opacity = config.cloud_opacity;
                m.state.alpha_test = config.cloud_alpha_test;
                Some(MaterialDescriptor::from(m).validated()?)
            }
            _ => None,
        };
        let glow = match self.material(self.glow) {
            Some(MaterialDescriptor::Shader(m)) => {
                let current = FresnelConfig::from_uniforms(&m.uniforms)?;
                let colors = FresnelConfig::from_hex(config.glow_rim_hex, config.glow_facing_hex)?;
                Some(FresnelConfig {
                    rim_color: colors.rim_color,
                    facing_color: colors.facing_color,
                    ..current
                })
            }
            _ => None,
        };
        let sun_color = Color::from_hex(config.sun.color_hex)?;

        if let Some(material) = clouds {
            self.set_material(self.clouds, material);
        }
        if let Some(glow) = glow
            && let Some(MaterialDescriptor::Shader(m)) = self.material_mut(self.glow)
        {
            m.uniforms = glow.to_uniforms();
        }
        self.sun.color = sun_color;
        self.sun.intensity = config.sun.intensity;
        self.sun.position = Vec3::from_array(config.sun.position);
        self.spin = SpinRates {
            earth: config.earth_spin,
            clouds: config.cloud_spin,
            stars: config.star_spin,
        };
        Ok(())
    }

    fn material(&self, id: NodeId) -> Option<&MaterialDescriptor> {
        match &self.scene.get(id)?.kind {
            NodeKind::Mesh { material, .. } => Some(material),
            _ => None,
        }
    }

    fn material_mut(&mut self, id: NodeId) -> Option<&mut MaterialDescriptor> {
        match &mut self.scene.get_mut(id)?.kind {
            NodeKind::Mesh { material, .. } => Some(material),
            _ => None,
        }
    }

    fn set_material(&mut self, id: NodeId, new: MaterialDescriptor) {
        if let Some(material) = self.material_mut(id) {
            *material = new;
        }
    }
}

/// Names of the scene settings that differ between `old` and `new` but only
/// take effect when the scene is rebuilt.
pub fn restart_required(old: &SceneConfig, new: &SceneConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if old.num_stars != new.num_stars {
        changed.push("num_stars");
    }
    if old.star_seed != new.star_seed {
        changed.push("star_seed");
    }
    if old.texture_dir != new.texture_dir {
        changed.push("texture_dir");
    }
    if old.axial_tilt_deg != new.axial_tilt_deg {
        changed.push("axial_tilt_deg");
    }
    changed
}
