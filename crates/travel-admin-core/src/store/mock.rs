//! Canned datasets served when neither the backend nor the cloud function
//! answers and the local store has nothing for a collection.

use serde_json::{json, Value};

use crate::models::Collection;

/// Static fallback records for a collection. Never empty.
pub fn dataset(collection: Collection) -> Vec<Value> {
    match collection {
        Collection::Products => products(),
        Collection::Regions => regions(),
        Collection::Banners => banners(),
        Collection::Orders => orders(),
    }
}

fn products() -> Vec<Value> {
    vec![
        json!({
            "_id": "product_001",
            "title": "三亚5日4晚双飞游",
            "description": "享受阳光、沙滩、海浪，体验热带风情",
            "coverImage": "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=400",
            "adultPrice": 2999,
            "childPrice": 1999,
            "region": "海南",
            "status": "active",
            "createTime": "2024-01-15T00:00:00Z"
        }),
        json!({
            "_id": "product_002",
            "title": "云南丽江大理6日游",
            "description": "感受古城魅力，体验民族风情",
            "coverImage": "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?w=400",
            "adultPrice": 3999,
            "childPrice": 2499,
            "region": "云南",
            "status": "active",
            "createTime": "2024-01-20T00:00:00Z"
        }),
    ]
}

fn regions() -> Vec<Value> {
    vec![
        json!({
            "_id": "region_001",
            "name": "海南",
            "imageUrl": "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=200",
            "productCount": 5,
            "isHot": true,
            "sort": 1,
            "status": "active"
        }),
        json!({
            "_id": "region_002",
            "name": "云南",
            "imageUrl": "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?w=200",
            "productCount": 8,
            "isHot": true,
            "sort": 2,
            "status": "active"
        }),
    ]
}

fn banners() -> Vec<Value> {
    vec![
        json!({
            "_id": "banner_001",
            "imageUrl": "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=800",
            "title": "美丽的海滩度假",
            "sort": 1,
            "status": "active"
        }),
        json!({
            "_id": "banner_002",
            "imageUrl": "https://images.unsplash.com/photo-1469474968028-56623f02e42e?w=800",
            "title": "山间徒步旅行",
            "sort": 2,
            "status": "active"
        }),
    ]
}

fn orders() -> Vec<Value> {
    vec![json!({
        "_id": "order_001",
        "orderNo": "T175424818024955743K",
        "productTitle": "三亚5日4晚双飞游",
        "openid": "user_001",
        "travelDate": "2025-08-14",
        "adultCount": 1,
        "childCount": 1,
        "totalPrice": 4998,
        "status": "cancelled",
        "createTime": "2024-01-15T00:00:00Z"
    })]
}
