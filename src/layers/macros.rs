//! Macros to reduce boilerplate in layer implementations

/// Macro to implement the accessor part of `LayerProvider`
///
/// This generates implementations for:
/// - id(), name(), kind()
/// - properties(), properties_mut()
/// - cache(), cache_mut()
/// - as_any(), as_any_mut()
///
/// Usage, inside `impl<C: TileContent> LayerProvider<C> for MyLayer<C>`:
/// ```ignore
/// impl_layer_trait!(C, properties, cache);
/// ```
#[macro_export]
macro_rules! impl_layer_trait {
    ($content:ty, $properties_field:ident, $cache_field:ident) => {
        fn id(&self) -> $crate::layers::base::LayerId {
            self.$properties_field.id
        }

        fn name(&self) -> &str {
            &self.$properties_field.name
        }

        fn kind(&self) -> $crate::layers::base::LayerKind {
            self.$properties_field.kind
        }

        fn properties(&self) -> &$crate::layers::base::LayerProperties {
            &self.$properties_field
        }

        fn properties_mut(&mut self) -> &mut $crate::layers::base::LayerProperties {
            &mut self.$properties_field
        }

        fn cache(&self) -> &$crate::layers::cache::TileCache<$content> {
            &self.$cache_field
        }

        fn cache_mut(&mut self) -> &mut $crate::layers::cache::TileCache<$content> {
            &mut self.$cache_field
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}
