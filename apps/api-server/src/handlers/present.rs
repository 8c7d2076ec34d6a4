//! Domain values to wire DTOs.

use blogicum_core::Page;
use blogicum_core::domain::{Category, Location, PostDraft, User};
use blogicum_core::services::{AuthorRef, CommentView, PostDetail, PostSummary};
use blogicum_shared::dto::{
    AuthorResponse, CategoryResponse, CommentResponse, LocationResponse, PageResponse,
    PostDetailResponse, PostRequest, PostSummaryResponse, UserResponse,
};

/// `with_email` is set only when the user is looking at their own account.
pub fn user(user: &User, with_email: bool) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: with_email.then(|| user.email.clone()),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        bio: user.bio.clone(),
        is_staff: user.is_staff,
        created_at: user.created_at,
    }
}

pub fn author(author: AuthorRef) -> AuthorResponse {
    AuthorResponse {
        id: author.id,
        username: author.username,
    }
}

pub fn category(category: Category) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        title: category.title,
        description: category.description,
        slug: category.slug,
    }
}

pub fn location(location: Location) -> LocationResponse {
    LocationResponse {
        id: location.id,
        title: location.title,
    }
}

pub fn post_summary(summary: PostSummary) -> PostSummaryResponse {
    let post = summary.post;
    PostSummaryResponse {
        id: post.id,
        title: post.title,
        text: post.text,
        pub_date: post.pub_date,
        image: post.image,
        is_published: post.is_published,
        created_at: post.created_at,
        author: author(summary.author),
        category: summary.category.map(category),
        location: summary.location.map(location),
        comment_count: summary.comment_count,
    }
}

pub fn comment(view: CommentView) -> CommentResponse {
    CommentResponse {
        id: view.comment.id,
        post_id: view.comment.post_id,
        text: view.comment.text,
        author: author(view.author),
        created_at: view.comment.created_at,
    }
}

pub fn post_detail(detail: PostDetail) -> PostDetailResponse {
    PostDetailResponse {
        post: post_summary(detail.summary),
        comments: detail.comments.into_iter().map(comment).collect(),
    }
}

pub fn page(page: Page<PostSummary>) -> PageResponse<PostSummaryResponse> {
    let has_next = page.has_next();
    let has_previous = page.has_previous();
    let page = page.map(post_summary);

    PageResponse {
        items: page.items,
        page: page.number,
        total_pages: page.total_pages,
        total_items: page.total_items,
        has_next,
        has_previous,
    }
}

pub fn draft(request: PostRequest) -> PostDraft {
    PostDraft {
        title: request.title,
        text: request.text,
        pub_date: request.pub_date,
        image: request.image,
        location_id: request.location_id,
        category_id: request.category_id,
        is_published: request.is_published,
    }
}
