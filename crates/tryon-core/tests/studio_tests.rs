//! Integration tests for the TryOnStudio public interface.

mod common;

use common::{png, CountingGenerator};
use std::sync::Arc;
use tempfile::TempDir;
use tryon_core::{
    Dispatch, ErrorKind, GarmentImport, ImageRef, ItemCategory, TryOnError, TryOnStudio,
    WardrobeItem,
};

async fn open_studio(dir: &TempDir, generator: Arc<CountingGenerator>) -> TryOnStudio {
    TryOnStudio::builder(dir.path())
        .with_generator(generator)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_fit_top_and_bottom_then_change_pose() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(CountingGenerator::default());
    let studio = open_studio(&dir, generator.clone()).await;

    studio.save_model_image(&png(8, 8, [120, 120, 120])).await.unwrap();
    let session = studio.session().await.unwrap();

    let top = studio.wardrobe_item("white-tshirt").await.unwrap();
    let bottom = studio.wardrobe_item("jeans-main").await.unwrap();
    // Garments must be loadable without network access
    let top = WardrobeItem {
        url: ImageRef::from(&png(4, 4, [250, 250, 250])),
        ..top
    };
    let bottom = WardrobeItem {
        url: ImageRef::from(&png(4, 4, [20, 40, 160])),
        ..bottom
    };
    session.toggle_garment(top.clone());
    session.toggle_garment(bottom.clone());

    assert_eq!(session.fit_outfit().await.unwrap(), Dispatch::Applied);
    assert_eq!(session.layer_count(), 1);
    let layer = session.top_layer().unwrap();
    assert_eq!(layer.garments(), &[top, bottom]);
    assert_eq!(layer.pose_count(), 1);
    let calls_after_fit = generator.calls();

    assert_eq!(session.select_pose(2).await.unwrap(), Dispatch::Applied);
    assert_eq!(generator.calls(), calls_after_fit + 1);

    let poses = studio.poses();
    assert_eq!(
        layer.resolved_poses(),
        vec![poses.first(), poses.get(2).unwrap()]
    );
    assert_eq!(
        session.view().display_image,
        layer.pose_image(poses.get(2).unwrap()).unwrap()
    );
}

#[tokio::test]
async fn test_failed_pose_change_is_reported_and_rolled_back() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(CountingGenerator::default());
    let studio = open_studio(&dir, generator.clone()).await;
    studio.save_model_image(&png(8, 8, [1, 1, 1])).await.unwrap();
    let session = studio.session().await.unwrap();

    generator.fail_next(TryOnError::Blocked {
        reason: "SAFETY".into(),
        message: String::new(),
    });
    let err = session.select_pose(4).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Blocked);

    let view = session.view();
    assert_eq!(view.pose_index, 0);
    let target = studio.poses().get(4).unwrap().to_string();
    assert!(!view.resolved_poses.contains(&target));
    assert_eq!(view.error.unwrap().kind, ErrorKind::Blocked);
    assert!(view.can_change_pose);
}

#[tokio::test]
async fn test_wardrobe_survives_restart() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(CountingGenerator::default());

    let imported = {
        let studio = open_studio(&dir, generator.clone()).await;
        let mut request = GarmentImport::new(png(6, 6, [9, 90, 9]), ItemCategory::Outerwear);
        request.file_name = Some("green jacket.webp".into());
        let item = studio.import_garment(request).await.unwrap();
        studio.rename_wardrobe_item("pants-brown", "Chinos").await.unwrap();
        studio.remove_wardrobe_item("polo-shirt").await.unwrap();
        studio.close().unwrap();
        item
    };

    let studio = open_studio(&dir, generator).await;
    let items = studio.wardrobe_items().await;
    assert_eq!(items.len(), 6);
    assert_eq!(items.last().unwrap(), &imported);
    assert_eq!(imported.name, "green jacket");
    assert_eq!(studio.wardrobe_item("pants-brown").await.unwrap().name, "Chinos");
    assert!(studio.wardrobe_item("polo-shirt").await.is_none());
}

#[tokio::test]
async fn test_model_persists_and_start_over_clears_it() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(CountingGenerator::default());
    {
        let studio = open_studio(&dir, generator.clone()).await;
        studio
            .create_model_from_photo(&png(5, 9, [200, 180, 160]))
            .await
            .unwrap();
        studio.close().unwrap();
    }

    let studio = open_studio(&dir, generator).await;
    let model = studio.load_model().await.unwrap().unwrap();
    assert!(model.image_url.is_inline());
    studio.session().await.unwrap();

    assert_eq!(studio.start_over().await.unwrap(), Dispatch::Applied);
    assert!(studio.load_model().await.unwrap().is_none());
    assert!(matches!(
        studio.session().await.unwrap_err(),
        TryOnError::Validation { .. }
    ));
    // The wardrobe is left alone
    assert_eq!(studio.wardrobe_items().await.len(), 6);
}

#[tokio::test]
async fn test_closed_studio_reports_storage_errors() {
    let dir = TempDir::new().unwrap();
    let studio = open_studio(&dir, Arc::new(CountingGenerator::default())).await;
    studio.store().await.unwrap();
    studio.close().unwrap();

    let err = studio.load_model().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
}
